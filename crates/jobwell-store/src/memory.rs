//! In-memory store for tests/dev.
//!
//! Shareable across queue instances via `Arc`, which is how tests simulate
//! a process restart: build a fresh queue over the same store and call
//! `start`.

use std::collections::HashMap;
use std::sync::RwLock;

use jobwell_core::{Job, JobId};

use crate::store::{JobStore, StoreError};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    ids: RwLock<Vec<JobId>>,
    records: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InMemoryStore {
    fn id_list(&self) -> Result<Vec<JobId>, StoreError> {
        Ok(self.ids.read().unwrap().clone())
    }

    fn record(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.records.read().unwrap().get(id).cloned())
    }

    fn save_id_list(&self, ids: &[JobId]) -> Result<(), StoreError> {
        *self.ids.write().unwrap() = ids.to_vec();
        Ok(())
    }

    fn set_record(&self, job: &Job) -> Result<(), StoreError> {
        self.records.write().unwrap().insert(job.id, job.clone());
        Ok(())
    }

    fn unset_record(&self, id: &JobId) -> Result<(), StoreError> {
        self.records.write().unwrap().remove(id);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.ids.write().unwrap().clear();
        self.records.write().unwrap().clear();
        Ok(())
    }
}
