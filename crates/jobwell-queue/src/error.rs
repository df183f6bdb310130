//! Queue-level errors.

use thiserror::Error;

use jobwell_store::StoreError;

/// Error surfaced by queue operations.
///
/// Job-level failures never appear here; they travel as `error` events.
/// These are caller mistakes and store faults.
#[derive(Debug, Error)]
pub enum QueueError {
    /// No task is registered for a job's type. A programming error (or a
    /// store shared across incompatible queue versions), not retryable.
    #[error("unknown task type: {0}")]
    UnknownTaskType(String),

    /// A task was defined without an action.
    #[error("task `{0}` has no action")]
    MissingAction(String),

    /// The persistent store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
