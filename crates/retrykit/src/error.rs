//! Error types for backoff execution.

use std::time::Duration;
use thiserror::Error;

/// Implemented by operation errors so the executor can tell rate limiting
/// apart from every other failure.
pub trait RateLimitSignal {
    /// Whether this failure means "too many requests".
    fn is_rate_limited(&self) -> bool;
}

/// Errors returned by [`with_backoff`](crate::with_backoff).
#[derive(Debug, Error)]
pub enum BackoffError<E> {
    /// The operation kept being rate limited until the ceiling was hit
    #[error(
        "maximum backoff ({}ms) would be reached with next execution",
        .max_delay.as_millis()
    )]
    Exhausted {
        /// The configured ceiling
        max_delay: Duration,
        /// Number of attempts made
        attempts: u32,
    },

    /// The operation failed with a non rate-limit error
    #[error(transparent)]
    Operation(E),
}

impl<E> BackoffError<E> {
    /// Whether retries were abandoned at the ceiling.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}
