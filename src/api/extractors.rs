//! Custom extractors for API parameters.

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use crate::api::middleware::error::ApiError;
use crate::validation::normalize_tx_hash;

/// Transaction hash path parameter, validated and lowercased.
///
/// Rejects anything that is not 64 hex characters with `400 Bad Request`.
#[derive(Debug)]
pub struct TxHash(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for TxHash
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        Ok(Self(normalize_tx_hash(&raw)?))
    }
}
