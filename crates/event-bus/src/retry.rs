//! # Retry Policy
//!
//! Exponential backoff shared by the producer (bounded number of attempts) and
//! the consumer loop (unbounded attempts, bounded delay).
//!
//! The delay before retry `n` (counted from zero) is `base * 2^n`, capped at
//! `max_delay`.

use std::time::Duration;

/// How often and how patiently to retry a failed bus operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Delays between attempts: one fewer than `max_attempts`.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            attempt: 0,
            limit: Some(self.max_attempts.max(1) - 1),
        }
    }
}

/// Iterator over successive backoff delays.
#[derive(Debug, Clone)]
pub struct Backoff {
    base_delay: Duration,
    max_delay: Duration,
    attempt: u32,
    limit: Option<u32>,
}

impl Backoff {
    /// A backoff that never runs out; delays plateau at `max_delay`.
    pub fn endless(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            attempt: 0,
            limit: None,
        }
    }

    /// Start over from `base_delay`, e.g. after a successful operation.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(limit) = self.limit {
            if self.attempt >= limit {
                return None;
            }
        }

        let factor = 2u32.saturating_pow(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        Some(self.base_delay.saturating_mul(factor).min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_schedule_doubles_from_base() {
        let delays: Vec<_> = RetryPolicy::default().backoff().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
            ]
        );
    }

    #[test]
    fn single_attempt_never_waits() {
        let policy = RetryPolicy::new(1, Duration::from_millis(10), Duration::from_secs(1));
        assert_eq!(policy.backoff().count(), 0);

        let zero = RetryPolicy::new(0, Duration::from_millis(10), Duration::from_secs(1));
        assert_eq!(zero.backoff().count(), 0);
    }

    #[test]
    fn endless_backoff_plateaus_and_resets() {
        let mut backoff = Backoff::endless(Duration::from_millis(50), Duration::from_millis(300));
        let first: Vec<_> = backoff.by_ref().take(6).collect();
        assert_eq!(first[0], Duration::from_millis(50));
        assert_eq!(first[3], Duration::from_millis(300));
        assert_eq!(first[5], Duration::from_millis(300));

        backoff.reset();
        assert_eq!(backoff.next(), Some(Duration::from_millis(50)));
    }

    proptest! {
        #[test]
        fn delays_are_monotonic_and_capped(
            base_ms in 1u64..1_000,
            cap_ms in 1u64..60_000,
            attempts in 1u32..40,
        ) {
            let policy = RetryPolicy::new(
                attempts,
                Duration::from_millis(base_ms),
                Duration::from_millis(cap_ms),
            );
            let delays: Vec<_> = policy.backoff().collect();
            prop_assert_eq!(delays.len() as u32, attempts - 1);

            let mut previous = Duration::ZERO;
            for (attempt, delay) in delays.into_iter().enumerate() {
                prop_assert!(delay >= previous);
                prop_assert!(delay <= policy.max_delay);
                prop_assert_eq!(delay, policy.delay_for(attempt as u32));
                previous = delay;
            }
        }
    }
}
