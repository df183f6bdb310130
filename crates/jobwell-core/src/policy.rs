//! Task execution policies and the replay decision.

use std::time::Duration;

/// Execution policy for one task type.
///
/// Defaults match a fire-once task: no retries, 2s between retries when
/// they are enabled, unbounded lifetime, no per-attempt timeout, no
/// initial delay, no connectivity requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPolicy {
    /// Maximum retries after the initial attempt. `max_retries = k`
    /// permits `k + 1` attempts in total.
    pub max_retries: u32,
    /// Wait between a failed/timed-out attempt and the next one. Applies
    /// to every retry.
    pub retry_interval: Duration,
    /// Total time budget from job creation. `None` is unbounded.
    pub lifetime: Option<Duration>,
    /// Per-attempt time budget. `None` disables the timeout.
    pub timeout: Option<Duration>,
    /// One-time wait before the very first attempt only.
    pub initial_delay: Option<Duration>,
    /// Skip attempts (and schedule a replay) while connectivity is down.
    pub requires_online: bool,
}

impl Default for TaskPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            retry_interval: Duration::from_secs(2),
            lifetime: None,
            timeout: None,
            initial_delay: None,
            requires_online: false,
        }
    }
}

impl TaskPolicy {
    /// The replay decision, shared by the failure, timeout, and offline
    /// paths: a job is replayed iff its attempt budget has room **and**
    /// lifetime remains. `remaining` is the time left until the lifetime
    /// deadline (`None` when the lifetime is unbounded).
    ///
    /// `retry_count` is the attempt that just ended, so after the Nth
    /// attempt the job replays iff `N <= max_retries`.
    pub fn should_replay(&self, retry_count: u32, remaining: Option<Duration>) -> bool {
        let budget_left = retry_count <= self.max_retries;
        let lifetime_left = remaining.is_none_or(|r| r > Duration::ZERO);
        budget_left && lifetime_left
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults_are_fire_once() {
        let policy = TaskPolicy::default();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.retry_interval, Duration::from_secs(2));
        assert!(policy.lifetime.is_none());
        assert!(policy.timeout.is_none());
        assert!(policy.initial_delay.is_none());
        assert!(!policy.requires_online);
    }

    #[test]
    fn max_retries_permits_one_extra_attempt() {
        let policy = TaskPolicy {
            max_retries: 2,
            ..Default::default()
        };

        // Attempts 1 and 2 replay; attempt 3 is the last.
        assert!(policy.should_replay(1, None));
        assert!(policy.should_replay(2, None));
        assert!(!policy.should_replay(3, None));
    }

    #[test]
    fn no_retries_means_single_attempt() {
        let policy = TaskPolicy::default();
        assert!(!policy.should_replay(1, None));
    }

    #[test]
    fn exhausted_lifetime_blocks_replay() {
        let policy = TaskPolicy {
            max_retries: 10,
            ..Default::default()
        };

        assert!(policy.should_replay(1, Some(Duration::from_millis(1))));
        assert!(!policy.should_replay(1, Some(Duration::ZERO)));
    }

    proptest! {
        // Once the budget says no, more attempts can never say yes.
        #[test]
        fn replay_is_monotone_in_attempts(max_retries in 0u32..100, n in 1u32..200) {
            let policy = TaskPolicy { max_retries, ..Default::default() };
            if !policy.should_replay(n, None) {
                prop_assert!(!policy.should_replay(n + 1, None));
            }
        }

        // Shrinking the remaining lifetime can only flip yes -> no.
        #[test]
        fn replay_is_monotone_in_lifetime(ms in 0u64..10_000, n in 1u32..10) {
            let policy = TaskPolicy { max_retries: 100, ..Default::default() };
            let more = policy.should_replay(n, Some(Duration::from_millis(ms + 1)));
            let less = policy.should_replay(n, Some(Duration::from_millis(ms)));
            prop_assert!(more || !less);
        }
    }
}
