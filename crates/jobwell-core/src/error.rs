//! Failure taxonomy for jobs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a job reached its terminal `error` event.
///
/// Retryable outcomes (action failure, attempt timeout, offline) never
/// surface here; they are contained inside the task state machine. A job
/// dies for exactly one of two reasons.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The total time budget from creation ran out. Always terminal,
    /// irrespective of remaining retry budget.
    #[error("lifetime expired")]
    LifetimeExpired,

    /// Every permitted attempt failed or timed out.
    #[error("retry budget exhausted: {last_error}")]
    RetriesExhausted { last_error: String },
}

/// Identifier parse failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("invalid identifier: {0}")]
    Invalid(String),
}
