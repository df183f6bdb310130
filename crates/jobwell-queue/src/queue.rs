//! Queue orchestration: job set, task registry, persistence, recovery.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use jobwell_core::{Job, JobEvent, JobId, QueueEvent};
use jobwell_events::{InMemoryNotifier, Notifier, Subscription};
use jobwell_store::JobStore;

use crate::error::QueueError;
use crate::probe::{AlwaysOnline, ConnectivityProbe};
use crate::task::{AttemptOutcome, Task};

/// Handle returned by [`Queue::create`].
///
/// The handle is subscribed to the job's events before the driver starts,
/// so no event can be missed between creation and observation.
#[derive(Debug)]
pub struct JobHandle {
    job: Job,
    events: Subscription<JobEvent>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.job.id
    }

    /// The job as it looked at creation time.
    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Wait for the job's next event. `None` after the terminal event has
    /// been consumed (or after [`Queue::stop`]).
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        self.events.recv().await
    }
}

struct ActiveJob {
    job: Job,
    notifier: Arc<InMemoryNotifier<JobEvent>>,
}

struct Inner {
    id: String,
    tasks: Mutex<HashMap<String, Arc<Task>>>,
    jobs: Mutex<Vec<ActiveJob>>,
    drivers: Mutex<HashMap<JobId, JoinHandle<()>>>,
    store: Arc<dyn JobStore>,
    notifier: InMemoryNotifier<QueueEvent>,
    probe: Arc<dyn ConnectivityProbe>,
}

/// The orchestrator: owns the active job set, the task registry, and the
/// persistent store handle.
///
/// Cheap to clone; clones share state. The task registry is scoped to the
/// instance — two queues never share definitions. All methods expect a
/// tokio runtime: job driving happens on spawned tasks.
///
/// Invariant kept across create/process/remove: a job id is in the
/// in-memory set iff it is in the store's id list iff the store holds its
/// record (modulo a crash between the two store writes, which recovery
/// tolerates).
#[derive(Clone)]
pub struct Queue {
    inner: Arc<Inner>,
}

impl Queue {
    pub fn new(id: impl Into<String>, store: Arc<dyn JobStore>) -> Self {
        Self::with_probe(id, store, Arc::new(AlwaysOnline))
    }

    /// A queue whose `online()` tasks consult `probe` before each attempt.
    pub fn with_probe(
        id: impl Into<String>,
        store: Arc<dyn JobStore>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: id.into(),
                tasks: Mutex::new(HashMap::new()),
                jobs: Mutex::new(Vec::new()),
                drivers: Mutex::new(HashMap::new()),
                store,
                notifier: InMemoryNotifier::new(),
                probe,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Register a task definition under its name.
    ///
    /// Re-defining a name replaces the entry for jobs dispatched from then
    /// on; jobs already in flight keep the task they resolved.
    pub fn define(&self, task: Task) -> Result<(), QueueError> {
        if !task.has_action() {
            return Err(QueueError::MissingAction(task.name().to_string()));
        }
        let mut tasks = self.inner.tasks.lock().unwrap();
        tasks.insert(task.name().to_string(), Arc::new(task));
        Ok(())
    }

    /// Create a job: persist it (id list first, then record), append it to
    /// the in-memory set, and hand it to its task asynchronously.
    ///
    /// Returns immediately; the handle observes every event the job emits.
    pub fn create(
        &self,
        task_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<JobHandle, QueueError> {
        let job = Job::new(task_type, payload);
        let notifier = Arc::new(InMemoryNotifier::new());
        let events = notifier.subscribe();

        {
            let mut jobs = self.inner.jobs.lock().unwrap();
            jobs.push(ActiveJob {
                job: job.clone(),
                notifier: Arc::clone(&notifier),
            });

            let ids: Vec<JobId> = jobs.iter().map(|active| active.job.id).collect();
            let written = self
                .inner
                .store
                .save_id_list(&ids)
                .and_then(|()| self.inner.store.set_record(&job));
            if let Err(err) = written {
                // Keep memory and store consistent: undo the append.
                jobs.pop();
                let ids: Vec<JobId> = jobs.iter().map(|active| active.job.id).collect();
                let _ = self.inner.store.save_id_list(&ids);
                return Err(err.into());
            }
        }

        debug!(queue = %self.inner.id, job_id = %job.id, task = %job.task_type, "job created");
        self.spawn_driver(job.clone(), notifier);
        Ok(JobHandle { job, events })
    }

    /// Reload persisted jobs and re-enter processing for each of them.
    ///
    /// This is the crash-recovery path: records carry `retry_count`, so a
    /// job persisted mid-retry resumes its attempt budget where it
    /// stopped. A listed id with no record (crash between the two store
    /// writes) is skipped with a warning.
    pub fn start(&self) -> Result<(), QueueError> {
        let ids = self.inner.store.id_list()?;
        let mut restored = Vec::new();

        {
            let mut jobs = self.inner.jobs.lock().unwrap();
            for id in ids {
                match self.inner.store.record(&id)? {
                    Some(job) => {
                        let notifier = Arc::new(InMemoryNotifier::new());
                        jobs.push(ActiveJob {
                            job: job.clone(),
                            notifier: Arc::clone(&notifier),
                        });
                        restored.push((job, notifier));
                    }
                    None => {
                        warn!(queue = %self.inner.id, job_id = %id, "listed job has no record, skipping");
                    }
                }
            }
        }

        info!(queue = %self.inner.id, jobs = restored.len(), "resuming persisted jobs");
        for (job, notifier) in restored {
            self.spawn_driver(job, notifier);
        }
        Ok(())
    }

    /// Remove a job from the in-memory set and the store. No-op if the id
    /// is not tracked.
    pub fn remove(&self, id: JobId) -> Result<(), QueueError> {
        let mut jobs = self.inner.jobs.lock().unwrap();
        let Some(index) = jobs.iter().position(|active| active.job.id == id) else {
            return Ok(());
        };
        jobs.remove(index);

        let ids: Vec<JobId> = jobs.iter().map(|active| active.job.id).collect();
        self.inner.store.save_id_list(&ids)?;
        self.inner.store.unset_record(&id)?;
        Ok(())
    }

    /// Stop processing: abort every driver (cancelling in-flight attempts
    /// and timers) and detach all job listeners. Persisted state is left
    /// untouched, so a fresh instance over the same store can resume.
    pub fn stop(&self) {
        let drivers = std::mem::take(&mut *self.inner.drivers.lock().unwrap());
        for handle in drivers.into_values() {
            handle.abort();
        }
        for active in self.inner.jobs.lock().unwrap().iter() {
            active.notifier.detach_all();
        }
        info!(queue = %self.inner.id, "queue stopped");
    }

    /// Wipe the in-memory set and the store, aborting every driver so a
    /// job waiting out a retry cannot re-persist its record afterwards.
    pub fn clear(&self) -> Result<(), QueueError> {
        let drivers = std::mem::take(&mut *self.inner.drivers.lock().unwrap());
        for handle in drivers.into_values() {
            handle.abort();
        }
        {
            let mut jobs = self.inner.jobs.lock().unwrap();
            for active in jobs.iter() {
                active.notifier.detach_all();
            }
            jobs.clear();
        }
        self.inner.store.clear()?;
        Ok(())
    }

    /// Stop processing, then wipe memory and store.
    pub fn destroy(&self) -> Result<(), QueueError> {
        self.stop();
        self.clear()
    }

    /// Subscribe to terminal events re-emitted on the queue.
    pub fn subscribe(&self) -> Subscription<QueueEvent> {
        self.inner.notifier.subscribe()
    }

    /// Subscribe to one active job's events. `None` if the id is not
    /// tracked (already terminal, or never created here).
    pub fn subscribe_job(&self, id: JobId) -> Option<Subscription<JobEvent>> {
        let jobs = self.inner.jobs.lock().unwrap();
        jobs.iter()
            .find(|active| active.job.id == id)
            .map(|active| active.notifier.subscribe())
    }

    /// Snapshot of the active jobs, in creation order.
    pub fn jobs(&self) -> Vec<Job> {
        self.inner
            .jobs
            .lock()
            .unwrap()
            .iter()
            .map(|active| active.job.clone())
            .collect()
    }

    fn is_tracked(&self, id: JobId) -> bool {
        self.inner
            .jobs
            .lock()
            .unwrap()
            .iter()
            .any(|active| active.job.id == id)
    }

    fn spawn_driver(&self, job: Job, notifier: Arc<InMemoryNotifier<JobEvent>>) {
        let queue = self.clone();
        let id = job.id;
        // Hold the map lock across the spawn: the driver's own cleanup
        // cannot run until its handle has been inserted.
        let mut drivers = self.inner.drivers.lock().unwrap();
        let handle = tokio::spawn(async move {
            if let Err(err) = queue.drive(job, notifier).await {
                error!(queue = %queue.inner.id, job_id = %id, error = %err, "job dispatch failed");
            }
            queue.inner.drivers.lock().unwrap().remove(&id);
        });
        drivers.insert(id, handle);
    }

    /// Drive one job to a terminal event, then remove it from tracking and
    /// forward the terminal event on the queue. Runs on its own tokio
    /// task; attempts within the job are strictly sequential.
    async fn drive(
        &self,
        mut job: Job,
        notifier: Arc<InMemoryNotifier<JobEvent>>,
    ) -> Result<(), QueueError> {
        let task = {
            let tasks = self.inner.tasks.lock().unwrap();
            tasks.get(&job.task_type).cloned()
        };
        let Some(task) = task else {
            // Unknown types are a programming error: discard the job
            // without any terminal event.
            self.remove(job.id)?;
            notifier.detach_all();
            return Err(QueueError::UnknownTaskType(job.task_type));
        };

        // The initial delay applies once, before the very first attempt.
        if job.retry_count == 0 {
            if let Some(delay) = task.policy().initial_delay {
                tokio::time::sleep(delay).await;
            }
        }

        // One lifetime deadline per job, keyed off created_at so recovered
        // jobs keep their original budget.
        let deadline = task.policy().lifetime.map(|lifetime| {
            let elapsed = Utc::now()
                .signed_duration_since(job.created_at)
                .to_std()
                .unwrap_or_default();
            Instant::now() + lifetime.saturating_sub(elapsed)
        });

        let terminal = loop {
            let outcome = task
                .run_attempt(&mut job, &notifier, self.inner.probe.as_ref(), deadline)
                .await;
            match outcome {
                AttemptOutcome::Completed => break QueueEvent::Complete(job.clone()),
                AttemptOutcome::Terminal(reason) => break QueueEvent::Error(job.clone(), reason),
                AttemptOutcome::Retry { wait } => {
                    // A concurrent remove or clear may have untracked the
                    // job; never write a record the id list no longer
                    // references.
                    if !self.is_tracked(job.id) {
                        notifier.detach_all();
                        return Ok(());
                    }
                    // Persist the attempt count so recovery resumes here.
                    self.inner.store.set_record(&job)?;
                    tokio::time::sleep(wait).await;
                }
            }
        };

        notifier.detach_all();
        if !self.is_tracked(job.id) {
            return Ok(());
        }
        self.remove(job.id)?;
        let _ = self.inner.notifier.emit(terminal);
        Ok(())
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("id", &self.inner.id)
            .field("jobs", &self.inner.jobs.lock().unwrap().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobwell_store::InMemoryStore;

    fn queue_over(store: &Arc<InMemoryStore>) -> Queue {
        Queue::new("test", Arc::clone(store) as Arc<dyn JobStore>)
    }

    #[tokio::test]
    async fn define_rejects_actionless_tasks() {
        let store = Arc::new(InMemoryStore::new());
        let queue = queue_over(&store);

        let err = queue.define(Task::new("nop")).unwrap_err();
        assert!(matches!(err, QueueError::MissingAction(name) if name == "nop"));
    }

    #[tokio::test]
    async fn create_persists_id_list_and_record() {
        let store = Arc::new(InMemoryStore::new());
        let queue = queue_over(&store);
        queue
            .define(Task::new("sync").action(|_job| async { Ok(()) }))
            .unwrap();

        let handle = queue
            .create("sync", serde_json::json!({"n": 1}))
            .unwrap();

        // Synchronously after create, memory and store agree.
        let ids = store.id_list().unwrap();
        assert_eq!(ids, vec![handle.id()]);
        assert!(store.record(&handle.id()).unwrap().is_some());
        assert_eq!(queue.jobs().len(), 1);
    }

    #[tokio::test]
    async fn unknown_task_type_discards_without_terminal_event() {
        let store = Arc::new(InMemoryStore::new());
        let queue = queue_over(&store);

        let mut handle = queue.create("ghost", serde_json::json!({})).unwrap();

        // The driver discards the job and closes the event stream without
        // emitting anything.
        assert_eq!(handle.next_event().await, None);
        assert!(store.id_list().unwrap().is_empty());
        assert!(store.record(&handle.id()).unwrap().is_none());
        assert!(queue.jobs().is_empty());
    }

    #[tokio::test]
    async fn finished_driver_leaves_no_handle_behind() {
        let store = Arc::new(InMemoryStore::new());
        let queue = queue_over(&store);
        queue
            .define(Task::new("sync").action(|_job| async { Ok(()) }))
            .unwrap();

        let mut handle = queue.create("sync", serde_json::json!({})).unwrap();

        assert_eq!(handle.next_event().await, Some(JobEvent::Complete));
        tokio::task::yield_now().await;
        assert!(queue.inner.drivers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_is_a_noop_for_unknown_ids() {
        let store = Arc::new(InMemoryStore::new());
        let queue = queue_over(&store);
        queue.remove(JobId::new()).unwrap();
    }

    #[tokio::test]
    async fn redefining_a_task_affects_new_jobs() {
        let store = Arc::new(InMemoryStore::new());
        let queue = queue_over(&store);

        queue
            .define(Task::new("flip").action(|_job| async { anyhow::bail!("v1") }))
            .unwrap();
        queue
            .define(Task::new("flip").action(|_job| async { Ok(()) }))
            .unwrap();

        let mut handle = queue.create("flip", serde_json::json!({})).unwrap();
        assert_eq!(handle.next_event().await, Some(JobEvent::Complete));
    }
}
