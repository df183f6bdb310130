//! `jobwell-core` — domain foundation for the job queue.
//!
//! This crate contains **pure domain** primitives (no timers, no IO): the
//! job model, task execution policies, the failure taxonomy, and the
//! duration-string resolver.

pub mod duration;
pub mod error;
pub mod event;
pub mod id;
pub mod job;
pub mod policy;

pub use duration::parse_duration;
pub use error::FailureReason;
pub use event::{JobEvent, QueueEvent};
pub use id::JobId;
pub use job::Job;
pub use policy::TaskPolicy;
