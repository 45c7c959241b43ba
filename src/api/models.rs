//! API request and response models.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::models::{BlockchainEventRecord, TransactionSubmissionRecord, WatchedAddressRecord};

/// Health status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Everything is working.
    Healthy,
    /// Serving, but the watcher cannot poll.
    Degraded,
    /// The database is unreachable.
    Unhealthy,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status
    pub status: HealthStatus,
    /// Crate version
    pub version: String,
    /// Seconds since the server started
    pub uptime_seconds: u64,
    /// Configured Cardano network
    pub network: String,
    /// Database connectivity
    pub database_status: HealthStatus,
    /// Whether the provider client is initialized
    pub provider_available: bool,
    /// Aggregate watcher running flag
    pub watcher_running: bool,
    /// Connected notification stream clients
    pub stream_clients: usize,
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type
    pub error: String,
    /// Error message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Result of a start/stop control action.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ControlResponse {
    /// Whether the action changed anything
    pub changed: bool,
    /// Human-readable outcome
    pub message: String,
}

impl ControlResponse {
    /// Builds a response choosing the message by outcome.
    #[must_use]
    pub fn new(changed: bool, done: &str, noop: &str) -> Self {
        Self {
            changed,
            message: if changed { done } else { noop }.to_string(),
        }
    }
}

/// Request body for adding a watched address.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WatchAddressRequest {
    /// Bech32 address on the configured network
    pub address: String,
    /// Optional label
    #[serde(default)]
    pub description: Option<String>,
    /// Only report activity after this block height
    #[serde(default)]
    pub from_block: Option<u64>,
}

/// Request body for tracking a submitted transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackTransactionRequest {
    /// Transaction hash (64 hex characters)
    pub tx_hash: String,
    /// Optional label
    #[serde(default)]
    pub description: Option<String>,
}

/// Query parameters for list endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListQuery {
    /// Only return active rows on the configured network
    #[serde(default)]
    pub active_only: bool,
}

/// Query parameters for recent events.
#[derive(Debug, Deserialize, IntoParams)]
pub struct EventsQuery {
    /// Maximum number of events (1-1000, default 50)
    #[serde(default = "default_limit")]
    pub limit: u32,
}

const fn default_limit() -> u32 {
    50
}

/// Watched address listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddressListResponse {
    /// Number of addresses returned
    pub count: usize,
    /// Watched addresses
    pub addresses: Vec<WatchedAddressRecord>,
}

/// Tracked submission listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionListResponse {
    /// Number of submissions returned
    pub count: usize,
    /// Tracked submissions
    pub transactions: Vec<TransactionSubmissionRecord>,
}

/// Recent events listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventListResponse {
    /// Number of events returned
    pub count: usize,
    /// Events, newest first
    pub events: Vec<BlockchainEventRecord>,
}
