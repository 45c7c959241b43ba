//! Unified API error handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::api::models::ErrorResponse;
use crate::error::WatcherError;
use crate::provider::ProviderErrorKind;

/// API-specific error type.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Invalid request parameters.
    BadRequest(String),
    /// The resource is in a state that does not allow the request.
    Conflict(String),
    /// Rate limit exceeded, locally or at the provider.
    RateLimitExceeded,
    /// The watcher cannot reach or is not configured for its provider.
    ServiceUnavailable(String),
    /// Database operation failed.
    DatabaseError(String),
    /// Internal server error.
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            Self::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_exceeded",
                "Rate limit exceeded. Please try again later.".to_string(),
            ),
            Self::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
            Self::DatabaseError(msg) => {
                error!(error = %msg, "Database error in API handler");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Database operation failed".to_string(),
                )
            }
            Self::InternalError(msg) => {
                error!(error = %msg, "Internal error in API handler");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: None,
        });

        (status, body).into_response()
    }
}

impl From<WatcherError> for ApiError {
    fn from(err: WatcherError) -> Self {
        match err {
            WatcherError::ValidationError { message } => Self::BadRequest(message),
            WatcherError::ConfigError { message, .. } => Self::ServiceUnavailable(message),
            WatcherError::DatabaseError { message, .. } => Self::DatabaseError(message),
            WatcherError::Provider(e) => match e.kind {
                ProviderErrorKind::NotFound => Self::NotFound(e.message),
                ProviderErrorKind::RateLimited => Self::RateLimitExceeded,
                ProviderErrorKind::ProviderUnavailable if e.retryable => {
                    Self::ServiceUnavailable(e.message)
                }
                ProviderErrorKind::ProviderUnavailable => Self::InternalError(e.to_string()),
            },
            WatcherError::NotificationError { .. } => Self::InternalError(err.to_string()),
        }
    }
}
