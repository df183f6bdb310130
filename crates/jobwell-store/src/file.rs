//! JSON-file-backed store.
//!
//! Layout under `<root>/<namespace>/`:
//!
//! - `ids.json` — the ordered id list
//! - `<job-id>.json` — one record per job
//!
//! Each write replaces a whole file, which matches the overwrite-safe
//! contract of [`JobStore`]. A crash between the id-list write and the
//! record write leaves an orphaned id; recovery skips it.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use jobwell_core::{Job, JobId};

use crate::store::{JobStore, StoreError};

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) the namespace directory under `root`.
    pub fn open(root: impl Into<PathBuf>, namespace: &str) -> Result<Self, StoreError> {
        let dir = root.into().join(namespace);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn ids_path(&self) -> PathBuf {
        self.dir.join("ids.json")
    }

    fn record_path(&self, id: &JobId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl JobStore for FileStore {
    fn id_list(&self) -> Result<Vec<JobId>, StoreError> {
        match fs::read(self.ids_path()) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn record(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        match fs::read(self.record_path(id)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save_id_list(&self, ids: &[JobId]) -> Result<(), StoreError> {
        fs::write(self.ids_path(), serde_json::to_vec(ids)?)?;
        Ok(())
    }

    fn set_record(&self, job: &Job) -> Result<(), StoreError> {
        fs::write(self.record_path(&job.id), serde_json::to_vec(job)?)?;
        Ok(())
    }

    fn unset_record(&self, id: &JobId) -> Result<(), StoreError> {
        match fs::remove_file(self.record_path(id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn clear(&self) -> Result<(), StoreError> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}
