//! Error types for reconciliation.
//!
//! Errors are categorized so callers can tell transient rate limiting apart
//! from rejections by the remote system and from failures of a lifecycle
//! phase. Phase failures keep the original error as their source.

use crate::types::Phase;
use retrykit::{BackoffError, RateLimitSignal};
use thiserror::Error;

/// HTTP status the remote uses to signal rate limiting
pub const TOO_MANY_REQUESTS: u16 = 429;

/// Failure reported by a remote call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe_remote(.status, .message))]
pub struct RemoteError {
    /// Status code, when the failure came from a response
    pub status: Option<u16>,
    /// Message from the remote or the transport
    pub message: String,
}

fn describe_remote(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("status {code}: {message}"),
        None => message.to_string(),
    }
}

impl RemoteError {
    /// Error carrying a response status
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Error raised before any response was received
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Whether this is the rate-limit signal
    pub fn is_rate_limited(&self) -> bool {
        self.status == Some(TOO_MANY_REQUESTS)
    }
}

impl RateLimitSignal for RemoteError {
    fn is_rate_limited(&self) -> bool {
        RemoteError::is_rate_limited(self)
    }
}

/// Categories of errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited by the remote (transient, retryable)
    RateLimited,
    /// Retries were abandoned at the backoff ceiling
    BackoffExhausted,
    /// The remote rejected the request (validation, not found, conflict)
    Rejected,
    /// The caller's input could not be used
    InvalidInput,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RateLimited => "Rate limited by the remote service",
            Self::BackoffExhausted => "Gave up retrying a rate-limited request",
            Self::Rejected => "Request rejected by the remote service",
            Self::InvalidInput => "Invalid resource description",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::RateLimited => "Wait a moment and run again",
            Self::BackoffExhausted => {
                "Run again later or raise the maximum backoff delay"
            }
            Self::Rejected => "Check the attributes against the remote API documentation",
            Self::InvalidInput => "Fix the resource description in the manifest",
        }
    }
}

/// Errors that can occur during reconciliation.
#[derive(Debug, Error)]
pub enum Error {
    /// Rate limited outside the backoff executor
    #[error("rate limited: {0}")]
    RateLimited(RemoteError),

    /// Rate limiting persisted until the backoff ceiling
    #[error("maximum backoff ({max_delay_ms}ms) would be reached with next execution")]
    BackoffExhausted {
        /// The configured ceiling in milliseconds
        max_delay_ms: u64,
    },

    /// The remote rejected a request
    #[error("remote rejected request: {0}")]
    RemoteRejected(RemoteError),

    /// A create, update or delete failed
    #[error("{phase} failed for {resource}")]
    ReconciliationFailed {
        /// Phase that failed
        phase: Phase,
        /// Label of the resource
        resource: String,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },

    /// A response carried no identifier and none was known beforehand
    #[error("remote response for {resource} carries no sid")]
    MissingIdentifier {
        /// Label of the resource
        resource: String,
    },

    /// A resource reference could not be parsed
    #[error("invalid resource reference: {0:?}")]
    InvalidReference(String),
}

impl Error {
    /// Get the error category, looking through phase failures.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::RateLimited(_) => ErrorCategory::RateLimited,
            Error::BackoffExhausted { .. } => ErrorCategory::BackoffExhausted,
            Error::RemoteRejected(_) => ErrorCategory::Rejected,
            Error::ReconciliationFailed { source, .. } => source.category(),
            Error::MissingIdentifier { .. } => ErrorCategory::Rejected,
            Error::InvalidReference(_) => ErrorCategory::InvalidInput,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// The remote failure at the root of this error, if any.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Error::RateLimited(e) | Error::RemoteRejected(e) => Some(e),
            Error::ReconciliationFailed { source, .. } => source.remote(),
            _ => None,
        }
    }
}

impl From<RemoteError> for Error {
    fn from(err: RemoteError) -> Self {
        if err.is_rate_limited() {
            Error::RateLimited(err)
        } else {
            Error::RemoteRejected(err)
        }
    }
}

impl From<BackoffError<RemoteError>> for Error {
    fn from(err: BackoffError<RemoteError>) -> Self {
        match err {
            BackoffError::Exhausted { max_delay, .. } => Error::BackoffExhausted {
                max_delay_ms: max_delay.as_millis() as u64,
            },
            BackoffError::Operation(e) => e.into(),
        }
    }
}

/// Result type for reconciliation.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::time::Duration;

    #[test]
    fn test_remote_error_display() {
        assert_eq!(
            RemoteError::status(404, "not found").to_string(),
            "status 404: not found"
        );
        assert_eq!(RemoteError::transport("timed out").to_string(), "timed out");
    }

    #[test]
    fn test_from_remote_error_by_status() {
        let err: Error = RemoteError::status(429, "slow down").into();
        assert_eq!(err.category(), ErrorCategory::RateLimited);
        assert!(err.is_retryable());

        let err: Error = RemoteError::status(400, "bad").into();
        assert_eq!(err.category(), ErrorCategory::Rejected);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_from_backoff_exhausted() {
        let err: Error = BackoffError::<RemoteError>::Exhausted {
            max_delay: Duration::from_millis(4000),
            attempts: 3,
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::BackoffExhausted);
        assert!(err.to_string().contains("4000ms"));
    }

    #[test]
    fn test_reconciliation_failed_keeps_source() {
        let err = Error::ReconciliationFailed {
            phase: Phase::Create,
            resource: "taskrouter/Workspaces".to_string(),
            source: Box::new(RemoteError::status(409, "conflict").into()),
        };

        assert_eq!(err.to_string(), "create failed for taskrouter/Workspaces");
        assert_eq!(err.category(), ErrorCategory::Rejected);
        assert_eq!(err.remote().and_then(|e| e.status), Some(409));

        let source = err.source().expect("source is kept");
        assert!(source.to_string().contains("conflict"));
    }
}
