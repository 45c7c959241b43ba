//! Event log endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::instrument;

use crate::api::middleware::error::ApiError;
use crate::api::models::{ControlResponse, ErrorResponse, EventListResponse, EventsQuery};
use crate::app_state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/events",
    params(EventsQuery),
    responses(
        (status = 200, description = "Recent events, newest first", body = EventListResponse),
        (status = 400, description = "Invalid limit", body = ErrorResponse)
    ),
    tag = "Events"
)]
/// Returns the most recent detected events.
#[instrument(skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventListResponse>, ApiError> {
    if query.limit == 0 || query.limit > 1000 {
        return Err(ApiError::BadRequest(
            "limit must be between 1 and 1000".to_string(),
        ));
    }

    let events = state
        .repository
        .list_recent_events(i64::from(query.limit))
        .await?;

    Ok(Json(EventListResponse {
        count: events.len(),
        events,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/processed",
    params(
        ("id" = i64, Path, description = "Event id")
    ),
    responses(
        (status = 200, description = "Event marked processed", body = ControlResponse),
        (status = 404, description = "Unknown event", body = ErrorResponse)
    ),
    tag = "Events"
)]
/// Marks an event as handled by a downstream consumer.
#[instrument(skip(state))]
pub async fn mark_event_processed(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ControlResponse>, ApiError> {
    if !state.repository.mark_event_processed(id).await? {
        return Err(ApiError::NotFound(format!("Event {id} not found")));
    }

    Ok(Json(ControlResponse::new(true, "Event marked processed", "")))
}
