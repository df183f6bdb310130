//! `jobwell-queue` — the durable job queue.
//!
//! Callers define named [`Task`]s carrying an execution policy and an
//! async action, then create jobs of those types. The [`Queue`] persists
//! each job, drives it through the task's per-attempt state machine
//! (delay, optional attempt, race between action / timeout / lifetime,
//! retry-or-terminate), and removes it on its first terminal event. A
//! restarted process calls [`Queue::start`] to resume persisted jobs.
//!
//! ```ignore
//! let store = Arc::new(FileStore::open(data_dir, "queue-sync")?);
//! let queue = Queue::new("sync", store);
//! queue.define(
//!     Task::new("upload")
//!         .retry(2)
//!         .timeout(parse_duration("30s")?)
//!         .action(|job| async move { push(job.payload).await }),
//! )?;
//! queue.start()?;
//! let mut handle = queue.create("upload", json!({"file": "a.txt"}))?;
//! ```

pub mod error;
pub mod probe;
pub mod queue;
pub mod task;

pub use error::QueueError;
pub use probe::{AlwaysOnline, ConnectivityProbe};
pub use queue::{JobHandle, Queue};
pub use task::Task;

pub use jobwell_core::{FailureReason, Job, JobEvent, JobId, QueueEvent, TaskPolicy};
