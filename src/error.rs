//! Error types for the Cardano watcher.
//!
//! This module provides a unified error type [`WatcherError`] that encompasses
//! all possible errors that can occur while loading configuration, talking to
//! the blockchain data provider, persisting watch state, and delivering
//! notifications.
//!
//! # Design
//!
//! The error hierarchy is organized by layer:
//! - [`WatcherError::ConfigError`]: Configuration and environment issues (fatal at startup)
//! - [`WatcherError::Provider`]: Normalized blockchain provider failures
//! - [`WatcherError::DatabaseError`]: Persistence failures
//! - [`WatcherError::ValidationError`]: Caller input faults (bad address, bad hash)
//! - [`WatcherError::NotificationError`]: Notification sink failures
//!
//! Provider failures carry their own classification (see
//! [`crate::provider::ProviderError`]) so callers can decide whether to retry.
//!
//! # Example
//!
//! ```
//! use cardano_watcher::error::{WatcherError, WatcherResult};
//!
//! fn validate_interval(secs: u64) -> WatcherResult<()> {
//!     if secs == 0 {
//!         return Err(WatcherError::config("interval must be positive", None));
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;

use crate::provider::ProviderError;

/// Result type alias using [`WatcherError`].
pub type WatcherResult<T> = Result<T, WatcherError>;

/// Boxed error used as the optional underlying cause.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Unified error type for the watcher.
#[derive(Debug)]
pub enum WatcherError {
    /// Configuration or environment variable errors.
    ///
    /// Variants include:
    /// - Missing provider credentials
    /// - Unknown network name
    /// - Non-numeric or zero polling intervals
    ConfigError {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<BoxedSource>,
    },

    /// A normalized blockchain data provider failure.
    Provider(ProviderError),

    /// Database operation errors.
    ///
    /// Variants include:
    /// - Connection failures
    /// - Query execution errors
    /// - Migration failures
    /// - Transaction errors
    DatabaseError {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<BoxedSource>,
    },

    /// Caller input errors, surfaced synchronously.
    ///
    /// Variants include:
    /// - Malformed or wrong-network address
    /// - Malformed transaction hash
    /// - Unknown watch-list entry
    ValidationError {
        /// Human-readable error message
        message: String,
    },

    /// Notification delivery errors.
    ///
    /// Never propagated out of a scan; pollers log and continue.
    NotificationError {
        /// Human-readable error message
        message: String,
    },
}

impl WatcherError {
    /// Create a new configuration error.
    ///
    /// # Example
    ///
    /// ```
    /// use cardano_watcher::error::WatcherError;
    ///
    /// let err = WatcherError::config("BLOCKFROST_PROJECT_ID not set", None);
    /// assert!(matches!(err, WatcherError::ConfigError { .. }));
    /// ```
    #[must_use]
    pub fn config(message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self::ConfigError {
            message: message.into(),
            source,
        }
    }

    /// Create a new database error.
    ///
    /// # Example
    ///
    /// ```
    /// use cardano_watcher::error::WatcherError;
    ///
    /// let err = WatcherError::database("Connection failed", None);
    /// assert!(matches!(err, WatcherError::DatabaseError { .. }));
    /// ```
    #[must_use]
    pub fn database(message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self::DatabaseError {
            message: message.into(),
            source,
        }
    }

    /// Create a new validation error.
    ///
    /// # Example
    ///
    /// ```
    /// use cardano_watcher::error::WatcherError;
    ///
    /// let err = WatcherError::validation("address must not be empty");
    /// assert!(matches!(err, WatcherError::ValidationError { .. }));
    /// ```
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// Create a new notification error.
    #[must_use]
    pub fn notification(message: impl Into<String>) -> Self {
        Self::NotificationError {
            message: message.into(),
        }
    }

    /// Returns the provider error if this failure came from the provider.
    #[must_use]
    pub const fn as_provider(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider(err) => Some(err),
            _ => None,
        }
    }

    /// Whether retrying the failed operation may succeed.
    ///
    /// Only provider failures classified as retryable qualify.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(err) => err.retryable,
            _ => false,
        }
    }
}

impl fmt::Display for WatcherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError { message, .. } => write!(f, "Configuration error: {message}"),
            Self::Provider(err) => write!(f, "Provider error: {err}"),
            Self::DatabaseError { message, .. } => write!(f, "Database error: {message}"),
            Self::ValidationError { message } => write!(f, "Validation error: {message}"),
            Self::NotificationError { message } => write!(f, "Notification error: {message}"),
        }
    }
}

impl std::error::Error for WatcherError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConfigError { source, .. } | Self::DatabaseError { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &dyn std::error::Error),
            Self::Provider(err) => Some(err),
            Self::ValidationError { .. } | Self::NotificationError { .. } => None,
        }
    }
}

impl From<ProviderError> for WatcherError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err)
    }
}
