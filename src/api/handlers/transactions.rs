//! Tracked submission endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;

use crate::api::extractors::TxHash;
use crate::api::middleware::error::ApiError;
use crate::api::models::{ErrorResponse, ListQuery, TrackTransactionRequest, TransactionListResponse};
use crate::app_state::AppState;
use crate::db::models::TransactionSubmissionRecord;
use crate::validation::normalize_tx_hash;

#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    params(ListQuery),
    responses(
        (status = 200, description = "Tracked submissions", body = TransactionListResponse)
    ),
    tag = "Transactions"
)]
/// Lists tracked submissions, newest first.
#[instrument(skip(state))]
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let transactions = if query.active_only {
        state.repository.list_active_submissions(state.network()).await?
    } else {
        state.repository.list_submissions().await?
    };

    Ok(Json(TransactionListResponse {
        count: transactions.len(),
        transactions,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    request_body = TrackTransactionRequest,
    responses(
        (status = 201, description = "Submission tracked", body = TransactionSubmissionRecord),
        (status = 400, description = "Invalid transaction hash", body = ErrorResponse)
    ),
    tag = "Transactions"
)]
/// Starts tracking a submitted transaction.
#[instrument(skip(state, request), fields(tx_hash = %request.tx_hash))]
pub async fn track_transaction(
    State(state): State<AppState>,
    Json(request): Json<TrackTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionSubmissionRecord>), ApiError> {
    let tx_hash = normalize_tx_hash(&request.tx_hash)?;

    let submission = state
        .repository
        .track_submission(&tx_hash, request.description.as_deref(), state.network())
        .await?;

    Ok((StatusCode::CREATED, Json(submission)))
}

#[utoipa::path(
    get,
    path = "/api/v1/transactions/{hash}",
    params(
        ("hash" = String, Path, description = "Transaction hash")
    ),
    responses(
        (status = 200, description = "Tracked submission", body = TransactionSubmissionRecord),
        (status = 400, description = "Invalid transaction hash", body = ErrorResponse),
        (status = 404, description = "Not tracked", body = ErrorResponse)
    ),
    tag = "Transactions"
)]
/// Returns one tracked submission.
#[instrument(skip(state))]
pub async fn get_transaction(
    State(state): State<AppState>,
    TxHash(tx_hash): TxHash,
) -> Result<Json<TransactionSubmissionRecord>, ApiError> {
    state
        .repository
        .get_submission(&tx_hash)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Transaction {tx_hash} is not tracked")))
}

#[utoipa::path(
    post,
    path = "/api/v1/transactions/{hash}/fail",
    params(
        ("hash" = String, Path, description = "Transaction hash")
    ),
    responses(
        (status = 200, description = "Submission marked failed", body = TransactionSubmissionRecord),
        (status = 404, description = "Not tracked", body = ErrorResponse),
        (status = 409, description = "Submission is no longer pending", body = ErrorResponse)
    ),
    tag = "Transactions"
)]
/// Gives up on a pending submission; it is no longer polled.
#[instrument(skip(state))]
pub async fn fail_transaction(
    State(state): State<AppState>,
    TxHash(tx_hash): TxHash,
) -> Result<Json<TransactionSubmissionRecord>, ApiError> {
    let failed = state.repository.mark_submission_failed(&tx_hash).await?;

    let submission = state
        .repository
        .get_submission(&tx_hash)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Transaction {tx_hash} is not tracked")))?;

    if !failed {
        return Err(ApiError::Conflict(format!(
            "Transaction {tx_hash} is already {}",
            submission.status
        )));
    }

    Ok(Json(submission))
}
