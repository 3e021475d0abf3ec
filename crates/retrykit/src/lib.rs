//! # retrykit
//!
//! Exponential backoff with jitter for async remote calls that can be
//! rate limited.
//!
//! Only failures that report themselves as rate limited (see
//! [`RateLimitSignal`]) are retried. Every other failure is returned
//! immediately so callers never re-issue a request the remote side rejected.
//!
//! ## Example
//!
//! ```no_run
//! use retrykit::{BackoffConfig, RateLimitSignal, with_backoff};
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! struct HttpError(u16);
//!
//! impl RateLimitSignal for HttpError {
//!     fn is_rate_limited(&self) -> bool {
//!         self.0 == 429
//!     }
//! }
//!
//! # async fn fetch() -> Result<String, HttpError> { Ok(String::new()) }
//! # async fn run() {
//! let config = BackoffConfig::new(Duration::ZERO, Duration::from_secs(30));
//! let body = with_backoff(&config, None, fetch).await;
//! # }
//! ```
//!
//! ## Delay growth
//!
//! The first attempt waits `initial_delay`. After each rate-limited attempt
//! the delay doubles (a zero delay becomes `retry_base`) and a random jitter
//! in `0..=max_jitter` is added. Retrying stops with
//! [`BackoffError::Exhausted`] once doubling the current delay would exceed
//! `max_delay`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod retry;

pub use config::BackoffConfig;
pub use error::{BackoffError, RateLimitSignal};
pub use retry::{LogCallback, RetryCallback, with_backoff};
