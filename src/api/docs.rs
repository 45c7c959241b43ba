//! OpenAPI documentation for the admin API.

use utoipa::OpenApi;

use crate::api::handlers;

/// OpenAPI documentation for the admin API.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::watcher::get_status,
        handlers::watcher::start_watcher,
        handlers::watcher::stop_watcher,
        handlers::watcher::manual_poll,
        handlers::watcher::start_address_polling,
        handlers::watcher::stop_address_polling,
        handlers::watcher::start_transaction_polling,
        handlers::watcher::stop_transaction_polling,
        handlers::addresses::list_addresses,
        handlers::addresses::watch_address,
        handlers::addresses::unwatch_address,
        handlers::transactions::list_transactions,
        handlers::transactions::track_transaction,
        handlers::transactions::get_transaction,
        handlers::transactions::fail_transaction,
        handlers::events::list_events,
        handlers::events::mark_event_processed,
        handlers::stream::websocket_handler,
    ),
    components(schemas(
        crate::api::models::HealthResponse,
        crate::api::models::HealthStatus,
        crate::api::models::ErrorResponse,
        crate::api::models::ControlResponse,
        crate::api::models::WatchAddressRequest,
        crate::api::models::TrackTransactionRequest,
        crate::api::models::AddressListResponse,
        crate::api::models::TransactionListResponse,
        crate::api::models::EventListResponse,
        crate::db::models::WatchedAddressRecord,
        crate::db::models::TransactionSubmissionRecord,
        crate::db::models::BlockchainEventRecord,
        crate::db::models::SubmissionStatus,
        crate::watcher::StatusSnapshot,
        crate::watcher::PathStatus,
        crate::watcher::PollSummary,
    )),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Watcher", description = "Polling lifecycle control"),
        (name = "Addresses", description = "Watched address management"),
        (name = "Transactions", description = "Submission tracking"),
        (name = "Events", description = "Detected event log"),
        (name = "Streaming", description = "WebSocket notifications"),
    ),
    info(
        title = "Cardano Watcher API",
        version = "1.0.0",
        description = "Admin API for the dual-path Cardano address and transaction watcher",
    )
)]
pub struct ApiDoc;
