//! Retry policies for the control loop.
//!
//! When opening or reading a stream fails, the control loop asks its
//! [`RetryPolicy`] whether to start over from the override phase and how
//! long to wait first. `attempt` counts consecutive failures, starting at 0;
//! a clean cycle resets it.

use std::time::Duration;

/// Policy for recovering from stream failures.
pub trait RetryPolicy {
    /// Whether failure number `attempt` (0-based) should be retried.
    fn should_retry(&self, attempt: u32) -> bool;

    /// Delay before retry number `attempt`.
    fn delay(&self, attempt: u32) -> Duration;
}

/// Never retry: every stream failure ends the loop.
///
/// The default: a stream failure stops the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn should_retry(&self, _attempt: u32) -> bool {
        false
    }

    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

/// Exponential backoff retry policy.
///
/// Delays double with each consecutive failure, up to `max_delay`, and the
/// loop gives up after `max_attempts` consecutive failures.
///
/// ```
/// use std::time::Duration;
/// use rs_bollard::policy::{ExponentialBackoff, RetryPolicy};
///
/// let policy = ExponentialBackoff::new(4, Duration::from_millis(100), Duration::from_millis(300));
/// assert_eq!(policy.delay(0), Duration::from_millis(100));
/// assert_eq!(policy.delay(1), Duration::from_millis(200));
/// assert_eq!(policy.delay(2), Duration::from_millis(300));
/// assert!(policy.should_retry(3));
/// assert!(!policy.should_retry(4));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExponentialBackoff {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff policy.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(500), Duration::from_secs(30))
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    fn delay(&self, attempt: u32) -> Duration {
        let multiplier = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(multiplier).min(self.max_delay)
    }
}

/// Policy chosen at runtime from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopPolicy {
    /// Stop on the first failure.
    Exit(NoRetry),
    /// Retry with backoff.
    Backoff(ExponentialBackoff),
}

impl RetryPolicy for LoopPolicy {
    fn should_retry(&self, attempt: u32) -> bool {
        match self {
            LoopPolicy::Exit(p) => p.should_retry(attempt),
            LoopPolicy::Backoff(p) => p.should_retry(attempt),
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        match self {
            LoopPolicy::Exit(p) => p.delay(attempt),
            LoopPolicy::Backoff(p) => p.delay(attempt),
        }
    }
}
