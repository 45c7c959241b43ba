//! Watched address endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use crate::api::middleware::error::ApiError;
use crate::api::models::{
    AddressListResponse, ControlResponse, ErrorResponse, ListQuery, WatchAddressRequest,
};
use crate::app_state::AppState;
use crate::db::models::WatchedAddressRecord;
use crate::validation::validate_address;

#[utoipa::path(
    get,
    path = "/api/v1/addresses",
    params(ListQuery),
    responses(
        (status = 200, description = "Watched addresses", body = AddressListResponse)
    ),
    tag = "Addresses"
)]
/// Lists watched addresses.
#[instrument(skip(state))]
pub async fn list_addresses(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<AddressListResponse>, ApiError> {
    let addresses = if query.active_only {
        state.repository.list_active_addresses(state.network()).await?
    } else {
        state.repository.list_addresses().await?
    };

    Ok(Json(AddressListResponse {
        count: addresses.len(),
        addresses,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/addresses",
    request_body = WatchAddressRequest,
    responses(
        (status = 201, description = "Address watched", body = WatchedAddressRecord),
        (status = 400, description = "Invalid address", body = ErrorResponse)
    ),
    tag = "Addresses"
)]
/// Adds (or reactivates) a watched address.
#[instrument(skip(state, request), fields(address = %request.address))]
pub async fn watch_address(
    State(state): State<AppState>,
    Json(request): Json<WatchAddressRequest>,
) -> Result<(StatusCode, Json<WatchedAddressRecord>), ApiError> {
    let address = request.address.trim();
    validate_address(address, state.network())?;

    let watched = state
        .repository
        .add_watched_address(
            address,
            request.description.as_deref(),
            request.from_block,
            state.network(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(watched)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/addresses/{address}",
    params(
        ("address" = String, Path, description = "Watched address")
    ),
    responses(
        (status = 200, description = "Address no longer watched", body = ControlResponse),
        (status = 404, description = "Address is not being watched", body = ErrorResponse)
    ),
    tag = "Addresses"
)]
/// Stops watching an address. Its events are kept.
#[instrument(skip(state))]
pub async fn unwatch_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ControlResponse>, ApiError> {
    if !state.repository.deactivate_watched_address(&address).await? {
        return Err(ApiError::NotFound(format!(
            "Address {address} is not being watched"
        )));
    }

    info!(address = %address, "Address removed from watch list");
    Ok(Json(ControlResponse::new(true, "Address unwatched", "")))
}
