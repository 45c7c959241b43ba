//! Health check endpoint.

use axum::{extract::State, Json};
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use tracing::instrument;

use crate::api::models::{HealthResponse, HealthStatus};
use crate::app_state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    ),
    tag = "Health"
)]
/// Returns service health information.
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = SystemTime::now()
        .duration_since(state.start_time)
        .unwrap_or_default()
        .as_secs();

    let database_status = match state.repository.health_check().await {
        Ok(()) => HealthStatus::Healthy,
        Err(_) => HealthStatus::Unhealthy,
    };
    let provider_available = state.supervisor.provider().is_available();
    let watcher_running = state.supervisor.is_running();

    let status = match database_status {
        HealthStatus::Healthy if provider_available => HealthStatus::Healthy,
        HealthStatus::Healthy => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        network: state.network().to_string(),
        database_status,
        provider_available,
        watcher_running,
        stream_clients: state.stream_clients.load(Ordering::Relaxed),
    })
}
