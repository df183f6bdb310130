//! Tasks: a named execution policy plus the action it drives.
//!
//! Each attempt races three outcomes — the action future, the per-attempt
//! timeout, and the lifetime deadline — in one `select!`. The losing
//! branches are dropped on the spot, so a slow action can never complete
//! an attempt that a timer already decided.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::time::{self, Instant};
use tracing::debug;

use jobwell_core::{FailureReason, Job, JobEvent, TaskPolicy};
use jobwell_events::{InMemoryNotifier, Notifier};

use crate::probe::ConnectivityProbe;

type ActionFn = dyn Fn(Job) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// A named execution policy and the async action it runs.
///
/// Built with chainable setters, then registered via
/// [`crate::Queue::define`]:
///
/// ```ignore
/// Task::new("upload")
///     .retry(2)
///     .interval(Duration::from_millis(500))
///     .timeout(Duration::from_secs(30))
///     .action(|job| async move { do_upload(job).await })
/// ```
pub struct Task {
    name: String,
    policy: TaskPolicy,
    action: Option<Arc<ActionFn>>,
}

/// How one attempt ended, from the queue driver's point of view.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AttemptOutcome {
    /// Terminal success; `complete` was emitted on the job.
    Completed,
    /// Replay after `wait`; an informational event was emitted.
    Retry { wait: Duration },
    /// Terminal failure; `error` was emitted on the job.
    Terminal(FailureReason),
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policy: TaskPolicy::default(),
            action: None,
        }
    }

    /// Set the wait between a failed/timed-out attempt and the next retry.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.policy.retry_interval = interval;
        self
    }

    /// Set the total time budget from job creation.
    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.policy.lifetime = Some(lifetime);
        self
    }

    /// Set the maximum number of retries after the initial attempt.
    pub fn retry(mut self, count: u32) -> Self {
        self.policy.max_retries = count;
        self
    }

    /// Require connectivity before each attempt.
    pub fn online(mut self) -> Self {
        self.policy.requires_online = true;
        self
    }

    /// Set the per-attempt time budget.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.policy.timeout = Some(timeout);
        self
    }

    /// Set a one-time wait before the very first attempt only.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.policy.initial_delay = Some(delay);
        self
    }

    /// Set the action. `Ok(())` completes the job; `Err` fails the
    /// attempt and enters the replay decision.
    pub fn action<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn(Job) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.action = Some(Arc::new(move |job| action(job).boxed()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &TaskPolicy {
        &self.policy
    }

    pub(crate) fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Run one attempt of `job`, emitting events on its notifier.
    ///
    /// `deadline` is the lifetime deadline computed once per job from
    /// `created_at`; it is `None` for unbounded lifetimes.
    pub(crate) async fn run_attempt(
        &self,
        job: &mut Job,
        notifier: &InMemoryNotifier<JobEvent>,
        probe: &dyn ConnectivityProbe,
        deadline: Option<Instant>,
    ) -> AttemptOutcome {
        job.begin_attempt();

        if self.policy.requires_online && !probe.is_online() {
            debug!(task = %self.name, job_id = %job.id, attempt = job.retry_count, "offline, attempt skipped");
            let _ = notifier.emit(JobEvent::Offline);
            return self.replay_or_die(job, notifier, deadline, "connectivity unavailable".into());
        }

        let Some(action) = &self.action else {
            let _ = notifier.emit(JobEvent::Fail("task has no action".into()));
            return self.replay_or_die(job, notifier, deadline, "task has no action".into());
        };

        let ended = tokio::select! {
            result = action(job.clone()) => AttemptEnd::Action(result),
            _ = sleep_opt(self.policy.timeout) => AttemptEnd::TimedOut,
            _ = sleep_until_opt(deadline) => AttemptEnd::Expired,
        };

        match ended {
            AttemptEnd::Action(Ok(())) => {
                debug!(task = %self.name, job_id = %job.id, attempt = job.retry_count, "attempt completed");
                let _ = notifier.emit(JobEvent::Complete);
                AttemptOutcome::Completed
            }
            AttemptEnd::Action(Err(err)) => {
                let message = format!("{err:#}");
                debug!(task = %self.name, job_id = %job.id, attempt = job.retry_count, error = %message, "attempt failed");
                let _ = notifier.emit(JobEvent::Fail(message.clone()));
                self.replay_or_die(job, notifier, deadline, message)
            }
            AttemptEnd::TimedOut => {
                job.mark_timed_out();
                debug!(task = %self.name, job_id = %job.id, attempt = job.retry_count, "attempt timed out");
                let _ = notifier.emit(JobEvent::Timeout);
                self.replay_or_die(job, notifier, deadline, "attempt timed out".into())
            }
            AttemptEnd::Expired => {
                job.mark_expired();
                debug!(task = %self.name, job_id = %job.id, "lifetime expired");
                let reason = FailureReason::LifetimeExpired;
                let _ = notifier.emit(JobEvent::Error(reason.clone()));
                AttemptOutcome::Terminal(reason)
            }
        }
    }

    /// The replay decision shared by the failure, timeout, and offline
    /// paths. Emits the terminal `error` when the job will not be
    /// replayed.
    fn replay_or_die(
        &self,
        job: &mut Job,
        notifier: &InMemoryNotifier<JobEvent>,
        deadline: Option<Instant>,
        last_error: String,
    ) -> AttemptOutcome {
        let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        if self.policy.should_replay(job.retry_count, remaining) {
            return AttemptOutcome::Retry {
                wait: self.policy.retry_interval,
            };
        }

        let reason = if job.retry_count <= self.policy.max_retries {
            // The budget had room; the lifetime ran out between attempts.
            job.mark_expired();
            FailureReason::LifetimeExpired
        } else {
            FailureReason::RetriesExhausted { last_error }
        };
        let _ = notifier.emit(JobEvent::Error(reason.clone()));
        AttemptOutcome::Terminal(reason)
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

enum AttemptEnd {
    Action(anyhow::Result<()>),
    TimedOut,
    Expired,
}

async fn sleep_opt(duration: Option<Duration>) {
    match duration {
        Some(d) => time::sleep(d).await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(d) => time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::AlwaysOnline;

    use std::sync::atomic::{AtomicBool, Ordering};

    fn fresh_job(task_type: &str) -> Job {
        Job::new(task_type, serde_json::json!({}))
    }

    fn drain(sub: &mut jobwell_events::Subscription<JobEvent>) -> Vec<JobEvent> {
        let mut events = Vec::new();
        while let Ok(event) = sub.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn successful_attempt_emits_complete() {
        let task = Task::new("ok").action(|_job| async { Ok(()) });
        let notifier = InMemoryNotifier::new();
        let mut sub = notifier.subscribe();
        let mut job = fresh_job("ok");

        let outcome = task.run_attempt(&mut job, &notifier, &AlwaysOnline, None).await;

        assert_eq!(outcome, AttemptOutcome::Completed);
        assert_eq!(job.retry_count, 1);
        assert_eq!(drain(&mut sub), vec![JobEvent::Complete]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_attempt_without_budget_is_terminal() {
        let task = Task::new("boom").action(|_job| async { anyhow::bail!("boom") });
        let notifier = InMemoryNotifier::new();
        let mut sub = notifier.subscribe();
        let mut job = fresh_job("boom");

        let outcome = task.run_attempt(&mut job, &notifier, &AlwaysOnline, None).await;

        assert!(matches!(
            outcome,
            AttemptOutcome::Terminal(FailureReason::RetriesExhausted { .. })
        ));
        let events = drain(&mut sub);
        assert_eq!(events[0], JobEvent::Fail("boom".into()));
        assert!(matches!(events[1], JobEvent::Error(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_attempt_with_budget_schedules_replay() {
        let task = Task::new("boom")
            .retry(1)
            .interval(Duration::from_millis(10))
            .action(|_job| async { anyhow::bail!("boom") });
        let notifier = InMemoryNotifier::new();
        let mut job = fresh_job("boom");

        let outcome = task.run_attempt(&mut job, &notifier, &AlwaysOnline, None).await;

        assert_eq!(
            outcome,
            AttemptOutcome::Retry {
                wait: Duration::from_millis(10)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_action_loses_to_timeout() {
        let task = Task::new("slow")
            .timeout(Duration::from_millis(10))
            .action(|_job| async {
                time::sleep(Duration::from_millis(100)).await;
                Ok(())
            });
        let notifier = InMemoryNotifier::new();
        let mut sub = notifier.subscribe();
        let mut job = fresh_job("slow");

        let outcome = task.run_attempt(&mut job, &notifier, &AlwaysOnline, None).await;

        assert!(job.timed_out);
        assert!(matches!(outcome, AttemptOutcome::Terminal(_)));
        let events = drain(&mut sub);
        assert_eq!(events[0], JobEvent::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn lifetime_deadline_beats_action_and_retry_budget() {
        let task = Task::new("slow")
            .retry(10)
            .action(|_job| async {
                time::sleep(Duration::from_millis(100)).await;
                Ok(())
            });
        let notifier = InMemoryNotifier::new();
        let mut sub = notifier.subscribe();
        let mut job = fresh_job("slow");
        let deadline = Some(Instant::now() + Duration::from_millis(10));

        let outcome = task.run_attempt(&mut job, &notifier, &AlwaysOnline, deadline).await;

        assert!(job.expired);
        assert_eq!(outcome, AttemptOutcome::Terminal(FailureReason::LifetimeExpired));
        assert_eq!(drain(&mut sub), vec![JobEvent::Error(FailureReason::LifetimeExpired)]);
    }

    #[tokio::test(start_paused = true)]
    async fn lifetime_gone_between_attempts_marks_the_job_expired() {
        let task = Task::new("boom")
            .retry(5)
            .action(|_job| async { anyhow::bail!("boom") });
        let notifier = InMemoryNotifier::new();
        let mut job = fresh_job("boom");
        let deadline = Some(Instant::now());

        let outcome = task.run_attempt(&mut job, &notifier, &AlwaysOnline, deadline).await;

        // The retry budget had room, so the death is a lifetime death and
        // the job must say so.
        assert!(job.expired);
        assert_eq!(outcome, AttemptOutcome::Terminal(FailureReason::LifetimeExpired));
    }

    #[tokio::test(start_paused = true)]
    async fn offline_attempt_skips_the_action() {
        struct Offline;
        impl ConnectivityProbe for Offline {
            fn is_online(&self) -> bool {
                false
            }
        }

        static RAN: AtomicBool = AtomicBool::new(false);
        let task = Task::new("net").online().retry(1).action(|_job| async {
            RAN.store(true, Ordering::SeqCst);
            Ok(())
        });
        let notifier = InMemoryNotifier::new();
        let mut sub = notifier.subscribe();
        let mut job = fresh_job("net");

        let outcome = task.run_attempt(&mut job, &notifier, &Offline, None).await;

        assert!(!RAN.load(Ordering::SeqCst));
        assert_eq!(job.retry_count, 1);
        assert!(matches!(outcome, AttemptOutcome::Retry { .. }));
        assert_eq!(drain(&mut sub), vec![JobEvent::Offline]);
    }
}
