//! The job model: one submitted unit of work and its attempt state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::JobId;

/// A unit of work in flight.
///
/// The whole struct is the persisted record: `retry_count` is written back
/// after every failed attempt, so a recovered job resumes where it left
/// off rather than restarting its attempt budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    /// Unique job id.
    pub id: JobId,
    /// Selects the task that governs this job.
    pub task_type: String,
    /// Opaque caller payload, passed unmodified to the action.
    pub payload: serde_json::Value,
    /// Creation time; basis for lifetime-expiry computation.
    pub created_at: DateTime<Utc>,
    /// Attempts started so far. 0 at creation, 1 during the first attempt.
    pub retry_count: u32,
    /// Set when the per-attempt timeout fired before the action finished.
    pub timed_out: bool,
    /// Set when the lifetime timer fired before any successful completion.
    pub expired: bool,
}

impl Job {
    pub fn new(task_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: JobId::new(),
            task_type: task_type.into(),
            payload,
            created_at: Utc::now(),
            retry_count: 0,
            timed_out: false,
            expired: false,
        }
    }

    /// Start a new attempt: bump the counter and clear the per-attempt
    /// timeout flag. After the Nth attempt begins, `retry_count == N`.
    pub fn begin_attempt(&mut self) {
        self.retry_count += 1;
        self.timed_out = false;
    }

    pub fn mark_timed_out(&mut self) {
        self.timed_out = true;
    }

    pub fn mark_expired(&mut self) {
        self.expired = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_attempt_counts_up_and_clears_timeout_flag() {
        let mut job = Job::new("sync", serde_json::json!({"n": 1}));
        assert_eq!(job.retry_count, 0);

        job.begin_attempt();
        assert_eq!(job.retry_count, 1);

        job.mark_timed_out();
        job.begin_attempt();
        assert_eq!(job.retry_count, 2);
        assert!(!job.timed_out);
    }

    #[test]
    fn record_round_trips_through_json() {
        let mut job = Job::new("upload", serde_json::json!({"file": "a.txt"}));
        job.begin_attempt();
        job.begin_attempt();

        let bytes = serde_json::to_vec(&job).unwrap();
        let restored: Job = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(restored, job);
        assert_eq!(restored.retry_count, 2);
    }
}
