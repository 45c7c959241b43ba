//! Axum server setup and routing.

use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{docs::ApiDoc, handlers, middleware as api_middleware};
use crate::app_state::AppState;
use crate::error::WatcherError;

/// Builds the full application router.
pub fn build_router(state: AppState, rate_limit_rpm: u32, cors_origins: &[String]) -> Router {
    let limiter = api_middleware::rate_limit::create_rate_limiter(rate_limit_rpm);

    let api_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/watcher/status", get(handlers::watcher::get_status))
        .route("/watcher/start", post(handlers::watcher::start_watcher))
        .route("/watcher/stop", post(handlers::watcher::stop_watcher))
        .route("/watcher/poll", post(handlers::watcher::manual_poll))
        .route(
            "/watcher/address-polling/start",
            post(handlers::watcher::start_address_polling),
        )
        .route(
            "/watcher/address-polling/stop",
            post(handlers::watcher::stop_address_polling),
        )
        .route(
            "/watcher/transaction-polling/start",
            post(handlers::watcher::start_transaction_polling),
        )
        .route(
            "/watcher/transaction-polling/stop",
            post(handlers::watcher::stop_transaction_polling),
        )
        .route(
            "/addresses",
            get(handlers::addresses::list_addresses).post(handlers::addresses::watch_address),
        )
        .route(
            "/addresses/:address",
            delete(handlers::addresses::unwatch_address),
        )
        .route(
            "/transactions",
            get(handlers::transactions::list_transactions)
                .post(handlers::transactions::track_transaction),
        )
        .route(
            "/transactions/:hash",
            get(handlers::transactions::get_transaction),
        )
        .route(
            "/transactions/:hash/fail",
            post(handlers::transactions::fail_transaction),
        )
        .route("/events", get(handlers::events::list_events))
        .route(
            "/events/:id/processed",
            post(handlers::events::mark_event_processed),
        )
        .route("/stream", get(handlers::stream::websocket_handler));

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(cors_origins))
        .layer(middleware::from_fn(api_middleware::logging::log_requests))
        .layer(middleware::from_fn(move |req, next| {
            api_middleware::rate_limit::rate_limit(limiter.clone(), req, next)
        }));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api/v1", api_routes)
        .layer(middleware_stack)
        .with_state(state)
}

/// Run the admin API server until `shutdown` resolves.
///
/// # Errors
///
/// Returns a configuration error if the port cannot be bound or the server
/// fails while running.
pub async fn run_server<F>(
    state: AppState,
    port: u16,
    rate_limit_rpm: u32,
    cors_origins: &[String],
    shutdown: F,
) -> Result<(), WatcherError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state, rate_limit_rpm, cors_origins);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        WatcherError::config(format!("Failed to bind API server to {addr}"), Some(Box::new(e)))
    })?;

    info!(addr = %addr, "Starting API server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| WatcherError::config("API server terminated", Some(Box::new(e))))?;

    info!("API server stopped");
    Ok(())
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(header) => Some(header),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new().allow_origin(allowed)
}
