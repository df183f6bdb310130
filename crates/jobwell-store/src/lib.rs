//! Persistent store capability for the job queue.
//!
//! A store tracks two things per queue namespace: the ordered list of
//! active job ids and one record per id. The queue writes the id list
//! first, then the record; recovery therefore tolerates a listed id whose
//! record is missing (a crash between the two writes) by skipping it.

pub mod file;
pub mod memory;
pub mod store;

pub use file::FileStore;
pub use memory::InMemoryStore;
pub use store::{JobStore, StoreError};
