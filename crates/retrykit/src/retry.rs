//! Retry loop with exponential backoff and jitter for rate-limited calls.

use crate::config::BackoffConfig;
use crate::error::{BackoffError, RateLimitSignal};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Callback trait for retry progress notifications.
pub trait RetryCallback: Send + Sync {
    /// Called after a rate-limited attempt, before waiting out `next_delay`.
    ///
    /// # Arguments
    /// * `attempt` - The attempt that was rate limited (1-indexed)
    /// * `next_delay` - Delay before the next attempt, jitter included
    fn on_retry(&self, attempt: u32, next_delay: Duration);
}

/// Callback that logs every retry at warn level.
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, attempt: u32, next_delay: Duration) {
        log::warn!(
            "Attempt {} was rate limited, retrying in {}ms",
            attempt,
            next_delay.as_millis()
        );
    }
}

/// Execute an async operation, retrying only while it is rate limited.
///
/// The operation is invoked once per attempt; it must build a fresh future
/// each time.
///
/// # Arguments
/// * `config` - Backoff configuration
/// * `callback` - Optional callback for retry notifications
/// * `operation` - The operation to execute
///
/// # Returns
/// The operation's result, the first non rate-limit error, or
/// [`BackoffError::Exhausted`] once the ceiling would be exceeded.
pub async fn with_backoff<T, E, F, Fut>(
    config: &BackoffConfig,
    callback: Option<&dyn RetryCallback>,
    mut operation: F,
) -> Result<T, BackoffError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RateLimitSignal,
{
    let mut delay = config.initial_delay;
    let mut attempt: u32 = 0;

    loop {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_rate_limited() => {
                if !config.can_retry(delay) {
                    log::debug!(
                        "Giving up after {} attempts, next delay would exceed {}ms",
                        attempt,
                        config.max_delay.as_millis()
                    );
                    return Err(BackoffError::Exhausted {
                        max_delay: config.max_delay,
                        attempts: attempt,
                    });
                }

                delay = config.next_base_delay(delay) + jitter(config.max_jitter);

                if let Some(cb) = callback {
                    cb.on_retry(attempt, delay);
                }
            }
            Err(e) => return Err(BackoffError::Operation(e)),
        }
    }
}

/// Uniform random jitter in `0..=max`, millisecond resolution.
fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}
