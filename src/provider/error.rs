//! Provider failure classification.
//!
//! Every failure coming out of the blockchain data provider is normalized into
//! a [`ProviderError`] before it reaches a poller. The classification decides
//! whether a caller should back off, retry, or treat the result as a valid
//! negative answer.

use std::fmt;

use serde::Serialize;

/// Classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderErrorKind {
    /// Expected negative result (transaction not on-chain yet, unknown address).
    NotFound,
    /// Provider quota exhausted; callers should back off.
    RateLimited,
    /// Transient upstream or network fault, or an unclassified failure.
    ProviderUnavailable,
}

impl ProviderErrorKind {
    /// Stable tag used in logs and API responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::RateLimited => "RATE_LIMITED",
            Self::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
        }
    }
}

/// A normalized provider failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderError {
    /// Failure classification
    pub kind: ProviderErrorKind,
    /// Whether the same call may succeed if retried
    pub retryable: bool,
    /// Suggested HTTP-equivalent status (404, 429, 500 or 503)
    pub status: u16,
    /// Original (or prefixed) failure message
    pub message: String,
}

impl ProviderError {
    /// Creates a not-found error (status 404, not retryable).
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::NotFound,
            retryable: false,
            status: 404,
            message: message.into(),
        }
    }

    /// Creates a rate-limited error (status 429, retryable).
    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::RateLimited,
            retryable: true,
            status: 429,
            message: message.into(),
        }
    }

    /// Creates a transient unavailability error (status 503, retryable).
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::ProviderUnavailable,
            retryable: true,
            status: 503,
            message: message.into(),
        }
    }

    /// Creates a non-transient provider failure (status 500, not retryable).
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::ProviderUnavailable,
            retryable: false,
            status: 500,
            message: message.into(),
        }
    }

    /// Whether this is the expected "nothing there" answer.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ProviderErrorKind::NotFound
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind.as_str(), self.status, self.message)
    }
}

impl std::error::Error for ProviderError {}

/// A raw failure as observed at the provider boundary.
#[derive(Debug, Clone)]
pub enum ProviderFailure {
    /// Already classified upstream; passes through untouched.
    Normalized(ProviderError),
    /// The provider answered with a non-success status.
    Http {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },
    /// The request never produced a response (DNS, connect, timeout, decode).
    Transport {
        /// Transport error message
        message: String,
    },
}

impl From<ProviderError> for ProviderFailure {
    fn from(err: ProviderError) -> Self {
        Self::Normalized(err)
    }
}

const RATE_LIMIT_PATTERNS: &[&str] = &["rate limit", "too many requests"];
const NOT_FOUND_PATTERNS: &[&str] = &["not found"];
const NETWORK_PATTERNS: &[&str] = &[
    "timeout",
    "timed out",
    "network",
    "econnrefused",
    "connection refused",
    "enotfound",
    "host not found",
    "dns error",
    "error sending request",
];

fn matches_any(message: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| message.contains(p))
}

/// Normalize a raw provider failure, in strict priority order.
///
/// 1. Already-normalized errors pass through unchanged.
/// 2. 429 or a rate-limit message is [`ProviderErrorKind::RateLimited`].
/// 3. 404 or a "not found" message is [`ProviderErrorKind::NotFound`].
/// 4. 5xx is a retryable [`ProviderErrorKind::ProviderUnavailable`].
/// 5. Remaining 4xx is a non-retryable [`ProviderErrorKind::ProviderUnavailable`].
/// 6. Timeout and connection messages are retryable unavailability.
/// 7. Anything else is prefixed with `Unknown error:`.
///
/// # Example
///
/// ```
/// use cardano_watcher::provider::{normalize_failure, ProviderErrorKind, ProviderFailure};
///
/// let err = normalize_failure(ProviderFailure::Http {
///     status: 429,
///     message: "rate limit exceeded".to_string(),
/// });
/// assert_eq!(err.kind, ProviderErrorKind::RateLimited);
/// assert!(err.retryable);
/// ```
#[must_use]
pub fn normalize_failure(failure: ProviderFailure) -> ProviderError {
    let (status, message) = match failure {
        ProviderFailure::Normalized(err) => return err,
        ProviderFailure::Http { status, message } => (Some(status), message),
        ProviderFailure::Transport { message } => (None, message),
    };
    let lowered = message.to_lowercase();

    if status == Some(429) || matches_any(&lowered, RATE_LIMIT_PATTERNS) {
        return ProviderError::rate_limited(message);
    }

    if status == Some(404) || matches_any(&lowered, NOT_FOUND_PATTERNS) {
        return ProviderError::not_found(message);
    }

    match status {
        Some(500..=599) => return ProviderError::unavailable(message),
        Some(400..=499) => return ProviderError::failed(message),
        _ => {}
    }

    if matches_any(&lowered, NETWORK_PATTERNS) {
        return ProviderError::unavailable(message);
    }

    ProviderError::failed(format!("Unknown error: {message}"))
}
