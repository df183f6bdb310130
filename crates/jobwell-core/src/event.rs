//! Event messages emitted on jobs and on the queue.

use crate::error::FailureReason;
use crate::job::Job;

/// Events emitted on a single job while it is driven.
///
/// `Complete` and `Error` are terminal; the rest are informational and may
/// repeat across attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// The action finished successfully. Terminal.
    Complete,
    /// The job died. Terminal.
    Error(FailureReason),
    /// One attempt's action failed; carries the action error.
    Fail(String),
    /// One attempt hit its per-attempt time budget.
    Timeout,
    /// An attempt was skipped because connectivity was unavailable.
    Offline,
}

/// Terminal events re-emitted on the queue for external subscribers,
/// carrying the job as it looked when it finished.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    Complete(Job),
    Error(Job, FailureReason),
}

impl QueueEvent {
    pub fn job(&self) -> &Job {
        match self {
            QueueEvent::Complete(job) | QueueEvent::Error(job, _) => job,
        }
    }
}
