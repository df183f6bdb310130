//! Store abstraction.

use std::sync::Arc;

use jobwell_core::{Job, JobId};

/// Store error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Persistent job store, namespaced per queue identifier at construction.
///
/// Implementations must treat `save_id_list` and `set_record` as
/// independent overwrite-safe writes; atomicity across the pair is not
/// assumed anywhere.
pub trait JobStore: Send + Sync {
    /// The ordered list of active job ids (creation order). Empty if none
    /// were ever saved.
    fn id_list(&self) -> Result<Vec<JobId>, StoreError>;

    /// Load one job record.
    fn record(&self, id: &JobId) -> Result<Option<Job>, StoreError>;

    /// Overwrite the full ordered id list.
    fn save_id_list(&self, ids: &[JobId]) -> Result<(), StoreError>;

    /// Insert or overwrite one job record.
    fn set_record(&self, job: &Job) -> Result<(), StoreError>;

    /// Remove one job record. No-op if absent.
    fn unset_record(&self, id: &JobId) -> Result<(), StoreError>;

    /// Wipe the id list and every record in this namespace.
    fn clear(&self) -> Result<(), StoreError>;
}

impl<S> JobStore for Arc<S>
where
    S: JobStore + ?Sized,
{
    fn id_list(&self) -> Result<Vec<JobId>, StoreError> {
        (**self).id_list()
    }

    fn record(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        (**self).record(id)
    }

    fn save_id_list(&self, ids: &[JobId]) -> Result<(), StoreError> {
        (**self).save_id_list(ids)
    }

    fn set_record(&self, job: &Job) -> Result<(), StoreError> {
        (**self).set_record(job)
    }

    fn unset_record(&self, id: &JobId) -> Result<(), StoreError> {
        (**self).unset_record(id)
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }
}
