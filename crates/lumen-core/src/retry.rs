//! Retry delay policy.
//!
//! Delay computation is separated from the orchestrator's retry loop so
//! the arithmetic is testable without I/O. Server-directed delays
//! (`Retry-After`) are clamped to the configured maximum; everything else
//! uses exponential backoff with uniform jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::RetrySettings;

/// Retry delay policy derived from [`RetrySettings`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: f64,
}

impl RetryPolicy {
    /// Builds the policy from settings.
    #[must_use]
    pub fn new(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_delay: settings.base_delay,
            max_delay: settings.max_delay,
            jitter: settings.jitter,
        }
    }

    /// The total attempt budget per invocation.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// True while more attempts are allowed after `attempt` (1-based).
    #[must_use]
    pub fn attempts_remaining(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Backoff delay after a failed `attempt` (1-based):
    /// `min(max_delay, base_delay * 2^(attempt-1))` scaled by a uniform
    /// factor in `[1 - jitter, 1 + jitter]`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_delay);
        let factor = if self.jitter > 0.0 {
            rand::thread_rng().gen_range(1.0 - self.jitter..=1.0 + self.jitter)
        } else {
            1.0
        };
        exponential.mul_f64(factor)
    }

    /// Clamps a server-directed delay to the configured maximum.
    #[must_use]
    pub fn server_delay(&self, retry_after: Duration) -> Duration {
        retry_after.min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(jitter: f64) -> RetryPolicy {
        RetryPolicy::new(&RetrySettings {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter,
        })
    }

    #[test]
    fn test_exponential_growth_without_jitter() {
        let policy = policy(0.0);
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(7), Duration::from_secs(60));
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let policy = policy(0.25);
        for _ in 0..100 {
            let delay = policy.backoff_delay(2).as_secs_f64();
            assert!((1.5..=2.5).contains(&delay), "delay out of band: {delay}");
        }
    }

    #[test]
    fn test_large_attempt_does_not_overflow() {
        let policy = policy(0.0);
        assert_eq!(policy.backoff_delay(100), Duration::from_secs(60));
    }

    #[test]
    fn test_server_delay_clamped_to_max() {
        let policy = policy(0.25);
        assert_eq!(policy.server_delay(Duration::from_secs(2)), Duration::from_secs(2));
        assert_eq!(policy.server_delay(Duration::from_secs(600)), Duration::from_secs(60));
        assert_eq!(policy.server_delay(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_attempt_budget() {
        let policy = policy(0.0);
        assert_eq!(policy.max_attempts(), 3);
        assert!(policy.attempts_remaining(1));
        assert!(policy.attempts_remaining(2));
        assert!(!policy.attempts_remaining(3));
    }
}
