//! Blockchain data provider layer.
//!
//! The watcher never talks to Cardano directly. It goes through a narrow
//! [`ChainProvider`] contract with three queries:
//!
//! - "fetch transactions for address since block X"
//! - "fetch transaction by hash"
//! - "latest block height"
//!
//! [`ProviderClient`] owns the lazily-initialized provider handle and is what
//! the pollers and the supervisor share. The production implementation is
//! [`blockfrost::BlockfrostProvider`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │        ProviderClient        │
//! │ (idempotent initialize, the  │
//! │  handle shared by pollers)   │
//! └──────────────┬───────────────┘
//!                │ Arc<dyn ChainProvider>
//!        ┌───────▼────────┐
//!        │   Blockfrost   │
//!        │ (REST + retry) │
//!        └────────────────┘
//! ```

pub mod blockfrost;
pub mod error;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::ProviderSettings;
use crate::error::{WatcherError, WatcherResult};

pub use error::{normalize_failure, ProviderError, ProviderErrorKind, ProviderFailure};

/// Maximum number of transactions returned by one activity query.
pub const MAX_ACTIVITY_PAGE: usize = 100;

/// Transient summary of an on-chain transaction as seen by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxSummary {
    /// Transaction hash (64 hex chars)
    pub tx_hash: String,
    /// Height of the block that includes the transaction
    pub block_height: u64,
    /// Hash of the block that includes the transaction
    pub block_hash: String,
    /// Total output amount in lovelace
    pub amount: u64,
    /// Fee in lovelace
    pub fee: u64,
    /// Latest known block height minus the transaction's block height
    pub confirmations: u64,
    /// When the provider observed this transaction
    pub observed_at: DateTime<Utc>,
}

impl TxSummary {
    /// Confirmation count given the chain tip, saturating at zero.
    #[must_use]
    pub const fn confirmations_at(block_height: u64, latest_height: u64) -> u64 {
        latest_height.saturating_sub(block_height)
    }
}

/// Narrow query contract against a blockchain data source.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Transactions touching `address` strictly newer than `since_block`,
    /// oldest first, at most [`MAX_ACTIVITY_PAGE`] items.
    ///
    /// An address without activity yields an empty list, not an error.
    async fn fetch_address_activity(
        &self,
        address: &str,
        since_block: Option<u64>,
    ) -> Result<Vec<TxSummary>, ProviderError>;

    /// The transaction with `hash`, or `None` while it is not on-chain.
    async fn fetch_transaction(&self, hash: &str) -> Result<Option<TxSummary>, ProviderError>;

    /// Height of the current chain tip.
    async fn latest_block_height(&self) -> Result<u64, ProviderError>;
}

/// Shared, lazily-initialized handle to the configured [`ChainProvider`].
pub struct ProviderClient {
    settings: ProviderSettings,
    handle: OnceCell<Arc<dyn ChainProvider>>,
}

impl ProviderClient {
    /// Creates an uninitialized client for the given settings.
    #[must_use]
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            handle: OnceCell::new(),
        }
    }

    /// Creates a client that is already initialized with `provider`.
    ///
    /// Used when embedding the watcher with a custom data source.
    #[must_use]
    pub fn with_provider(settings: ProviderSettings, provider: Arc<dyn ChainProvider>) -> Self {
        Self {
            settings,
            handle: OnceCell::new_with(Some(provider)),
        }
    }

    /// Initializes the provider handle, returning the existing one on
    /// repeated calls.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::ConfigError`] when no project id is configured
    /// or the HTTP client cannot be built.
    pub async fn initialize(&self) -> WatcherResult<Arc<dyn ChainProvider>> {
        let handle = self
            .handle
            .get_or_try_init(|| async {
                let project_id = self.settings.project_id.as_deref().ok_or_else(|| {
                    WatcherError::config(
                        "BLOCKFROST_PROJECT_ID is required to initialize the provider",
                        None,
                    )
                })?;

                let provider =
                    blockfrost::BlockfrostProvider::new(project_id, &self.settings)?;
                info!(
                    network = %self.settings.network,
                    base_url = provider.base_url(),
                    "Blockchain provider initialized"
                );
                Ok::<Arc<dyn ChainProvider>, WatcherError>(Arc::new(provider))
            })
            .await?;

        debug!("Provider handle ready");
        Ok(Arc::clone(handle))
    }

    /// Returns the initialized handle.
    ///
    /// # Errors
    ///
    /// Returns a retryable [`ProviderError`] when [`Self::initialize`] has not
    /// succeeded yet.
    pub fn handle(&self) -> Result<Arc<dyn ChainProvider>, ProviderError> {
        self.handle
            .get()
            .cloned()
            .ok_or_else(|| ProviderError::unavailable("provider client is not initialized"))
    }

    /// Whether [`Self::initialize`] has run successfully.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.handle.initialized()
    }

    /// Settings this client was built from.
    #[must_use]
    pub const fn settings(&self) -> &ProviderSettings {
        &self.settings
    }
}
