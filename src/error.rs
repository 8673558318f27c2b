//! Error types for region fetching, retry configuration and rate-limited services.
use std::time::Duration;

/// Why a single fetch attempt (and, once retries are exhausted, the whole fetch) failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure; no response was received.
    #[error("network error: {0}")]
    Network(String),
    /// A response arrived with a non-success status.
    #[error("HTTP error: {status} {status_text}")]
    Http { status: u16, status_text: String },
    /// The body was not a valid region envelope.
    #[error("decode error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Every failure is retried: region lookups are plain GETs.
    pub fn is_retryable(&self) -> bool {
        true
    }

    /// Status code for `Http` failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Errors produced while building a retry policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// `max_attempts` must be > 0.
    #[error("max_attempts must be > 0 (got {0})")]
    InvalidMaxAttempts(usize),
    /// A region cache needs somewhere to fetch from.
    #[error("base_url must not be empty")]
    EmptyBaseUrl,
    /// The HTTP client could not be constructed.
    #[error("http client: {0}")]
    HttpClient(String),
}

/// Invalid rate-limit configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_requests must be > 0")]
    ZeroMaxRequests,
    #[error("window must be > 0")]
    ZeroWindow,
    #[error("unknown action '{0}'")]
    UnknownAction(String),
}

/// Error returned by a service wrapped in [`crate::rate_limit::RateLimitLayer`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError<E> {
    /// The caller exhausted the window for `action`; retry after `reset_in`.
    #[error("rate limited on '{action}', retry in {reset_in:?}")]
    RateLimited { action: String, reset_in: Duration },
    /// The wrapped service failed.
    #[error(transparent)]
    Inner(E),
}

impl<E> GuardError<E> {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Get the inner error if this is an Inner variant
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_display_includes_status() {
        let err = FetchError::Http { status: 503, status_text: "Service Unavailable".into() };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("Service Unavailable"));
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn decode_error_from_serde() {
        let err: FetchError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(err.is_decode());
        assert!(err.is_retryable());
        assert!(err.status().is_none());
    }

    #[test]
    fn guard_error_accessors() {
        let limited: GuardError<FetchError> =
            GuardError::RateLimited { action: "login".into(), reset_in: Duration::from_secs(3) };
        assert!(limited.is_rate_limited());
        assert!(limited.into_inner().is_none());

        let inner = GuardError::Inner(FetchError::Network("reset".into()));
        assert!(!inner.is_rate_limited());
        assert!(inner.into_inner().unwrap().is_network());
    }

    #[test]
    fn build_error_display() {
        assert_eq!(BuildError::InvalidMaxAttempts(0).to_string(), "max_attempts must be > 0 (got 0)");
    }
}
