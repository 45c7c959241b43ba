//! Watcher control endpoints.

use axum::{extract::State, Json};
use tracing::instrument;

use crate::api::middleware::error::ApiError;
use crate::api::models::{ControlResponse, ErrorResponse};
use crate::app_state::AppState;
use crate::watcher::{PollSummary, StatusSnapshot};

#[utoipa::path(
    get,
    path = "/api/v1/watcher/status",
    responses(
        (status = 200, description = "Watcher status", body = StatusSnapshot)
    ),
    tag = "Watcher"
)]
/// Returns the watcher status snapshot.
#[instrument(skip(state))]
pub async fn get_status(State(state): State<AppState>) -> Result<Json<StatusSnapshot>, ApiError> {
    Ok(Json(state.supervisor.status().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/watcher/start",
    responses(
        (status = 200, description = "Watcher started (or already running)", body = StatusSnapshot),
        (status = 503, description = "Provider not configured", body = ErrorResponse)
    ),
    tag = "Watcher"
)]
/// Starts every enabled polling path.
#[instrument(skip(state))]
pub async fn start_watcher(
    State(state): State<AppState>,
) -> Result<Json<StatusSnapshot>, ApiError> {
    state.supervisor.start().await?;
    Ok(Json(state.supervisor.status().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/watcher/stop",
    responses(
        (status = 200, description = "Watcher stopped", body = StatusSnapshot)
    ),
    tag = "Watcher"
)]
/// Stops both polling paths.
#[instrument(skip(state))]
pub async fn stop_watcher(State(state): State<AppState>) -> Result<Json<StatusSnapshot>, ApiError> {
    state.supervisor.stop().await;
    Ok(Json(state.supervisor.status().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/watcher/poll",
    responses(
        (status = 200, description = "Counts detected by the poll", body = PollSummary),
        (status = 503, description = "Provider not configured", body = ErrorResponse)
    ),
    tag = "Watcher"
)]
/// Runs one poll of both paths immediately.
#[instrument(skip(state))]
pub async fn manual_poll(State(state): State<AppState>) -> Result<Json<PollSummary>, ApiError> {
    Ok(Json(state.supervisor.manual_poll().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/watcher/address-polling/start",
    responses(
        (status = 200, description = "Address polling started", body = ControlResponse)
    ),
    tag = "Watcher"
)]
/// Starts the address path alone.
#[instrument(skip(state))]
pub async fn start_address_polling(
    State(state): State<AppState>,
) -> Result<Json<ControlResponse>, ApiError> {
    let started = state.supervisor.start_address_polling().await?;
    Ok(Json(ControlResponse::new(
        started,
        "Address polling started",
        "Address polling already active",
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/watcher/address-polling/stop",
    responses(
        (status = 200, description = "Address polling stopped", body = ControlResponse)
    ),
    tag = "Watcher"
)]
/// Stops the address path alone.
#[instrument(skip(state))]
pub async fn stop_address_polling(State(state): State<AppState>) -> Json<ControlResponse> {
    let stopped = state.supervisor.stop_address_polling().await;
    Json(ControlResponse::new(
        stopped,
        "Address polling stopped",
        "Address polling was not active",
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/watcher/transaction-polling/start",
    responses(
        (status = 200, description = "Transaction polling started", body = ControlResponse)
    ),
    tag = "Watcher"
)]
/// Starts the transaction path alone.
#[instrument(skip(state))]
pub async fn start_transaction_polling(
    State(state): State<AppState>,
) -> Result<Json<ControlResponse>, ApiError> {
    let started = state.supervisor.start_transaction_polling().await?;
    Ok(Json(ControlResponse::new(
        started,
        "Transaction polling started",
        "Transaction polling already active",
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/watcher/transaction-polling/stop",
    responses(
        (status = 200, description = "Transaction polling stopped", body = ControlResponse)
    ),
    tag = "Watcher"
)]
/// Stops the transaction path alone.
#[instrument(skip(state))]
pub async fn stop_transaction_polling(State(state): State<AppState>) -> Json<ControlResponse> {
    let stopped = state.supervisor.stop_transaction_polling().await;
    Json(ControlResponse::new(
        stopped,
        "Transaction polling stopped",
        "Transaction polling was not active",
    ))
}
