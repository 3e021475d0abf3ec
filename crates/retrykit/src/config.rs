//! Backoff configuration.

use std::time::Duration;

/// Default ceiling for a single backoff delay (2 minutes).
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(120);

/// Delay used for the first retry when the previous wait was zero.
pub const DEFAULT_RETRY_BASE: Duration = Duration::from_secs(1);

/// Default upper bound of the random jitter added to each retry.
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_secs(1);

/// Configuration for exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay before the first attempt
    pub initial_delay: Duration,
    /// Ceiling; retrying stops once the doubled delay would exceed it
    pub max_delay: Duration,
    /// Delay for the first retry when the current delay is zero
    pub retry_base: Duration,
    /// Upper bound of the random jitter added to every retry delay
    pub max_jitter: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: DEFAULT_MAX_DELAY,
            retry_base: DEFAULT_RETRY_BASE,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl BackoffConfig {
    /// Create a config with the given initial delay and ceiling.
    pub fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
            ..Default::default()
        }
    }

    /// Replace the ceiling.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Disable jitter, making delay growth fully deterministic.
    pub fn without_jitter(mut self) -> Self {
        self.max_jitter = Duration::ZERO;
        self
    }

    /// Whether a rate-limited attempt that waited `delay` may be retried.
    pub fn can_retry(&self, delay: Duration) -> bool {
        delay.saturating_mul(2) <= self.max_delay
    }

    /// Delay for the next attempt before jitter is applied.
    ///
    /// Sub-millisecond precision is dropped before doubling.
    pub fn next_base_delay(&self, delay: Duration) -> Duration {
        let whole_ms = Duration::from_millis(delay.as_millis() as u64);
        if whole_ms.is_zero() {
            self.retry_base
        } else {
            whole_ms.saturating_mul(2)
        }
    }
}
