//! Address path: records new activity on watched addresses.
//!
//! Per active address and scan:
//!
//! 1. No checkpoint yet: seed it with the chain tip and stop there, so only
//!    activity after the address was first scanned is reported.
//! 2. Fetch activity strictly after the checkpoint. A full page may end in
//!    the middle of a block; that block is left for the next scan.
//! 3. Record the new events and the advanced checkpoint in one transaction.
//! 4. After commit, emit one `newTransactions` notification.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::{Poller, PollingPath, ScanFlag};
use crate::config::Network;
use crate::db::models::WatchedAddressRecord;
use crate::db::Repository;
use crate::error::WatcherResult;
use crate::notification::{emit_best_effort, Notification, NotificationSink};
use crate::provider::{ChainProvider, ProviderClient, TxSummary, MAX_ACTIVITY_PAGE};

/// Scans watched addresses for new transactions.
pub struct AddressPoller {
    repository: Repository,
    provider: Arc<ProviderClient>,
    sink: Arc<dyn NotificationSink>,
    network: Network,
    scanning: ScanFlag,
}

impl AddressPoller {
    /// Creates a poller over the shared repository, provider and sink.
    #[must_use]
    pub fn new(
        repository: Repository,
        provider: Arc<ProviderClient>,
        sink: Arc<dyn NotificationSink>,
        network: Network,
    ) -> Self {
        Self {
            repository,
            provider,
            sink,
            network,
            scanning: ScanFlag::new(),
        }
    }

    /// Processes one address and returns the number of newly recorded events.
    async fn scan_address(
        &self,
        provider: &dyn ChainProvider,
        watched: &WatchedAddressRecord,
    ) -> WatcherResult<usize> {
        let address = watched.address.as_str();

        let Some(checkpoint) = watched.checkpoint() else {
            let tip = provider.latest_block_height().await?;
            if self.repository.seed_checkpoint(address, tip).await? {
                info!(address, checkpoint = tip, "Seeded checkpoint from chain tip");
            }
            return Ok(0);
        };

        let activity = provider
            .fetch_address_activity(address, Some(checkpoint))
            .await?;
        if activity.is_empty() {
            debug!(address, checkpoint, "No new activity");
            return Ok(0);
        }

        let complete = complete_blocks(&activity);
        if complete.len() < activity.len() {
            debug!(
                address,
                deferred = activity.len() - complete.len(),
                "Full page ends mid-block, deferring last block"
            );
        }

        let recorded = self
            .repository
            .record_address_activity(address, self.network, complete)
            .await?;
        if recorded.is_empty() {
            debug!(address, "Activity already recorded");
            return Ok(0);
        }

        let count = recorded.len();
        info!(address, count, "New transactions recorded");
        emit_best_effort(
            self.sink.as_ref(),
            &Notification::NewTransactions {
                address: address.to_string(),
                count,
                transactions: recorded,
            },
        );

        Ok(count)
    }
}

/// The prefix of an oldest-first page that covers whole blocks only.
///
/// A page shorter than [`MAX_ACTIVITY_PAGE`] is complete. A full page drops
/// the transactions of its last block, unless that block is all it holds.
fn complete_blocks(activity: &[TxSummary]) -> &[TxSummary] {
    if activity.len() < MAX_ACTIVITY_PAGE {
        return activity;
    }
    let Some(last) = activity.last() else {
        return activity;
    };

    match activity
        .iter()
        .rposition(|tx| tx.block_height < last.block_height)
    {
        Some(end) => &activity[..=end],
        None => {
            warn!(
                block_height = last.block_height,
                "Single block fills a whole activity page"
            );
            activity
        }
    }
}

#[async_trait]
impl Poller for AddressPoller {
    fn path(&self) -> PollingPath {
        PollingPath::Address
    }

    fn scan_flag(&self) -> &ScanFlag {
        &self.scanning
    }

    #[instrument(name = "address_scan", skip(self), fields(addresses = tracing::field::Empty))]
    async fn scan(&self) -> WatcherResult<usize> {
        let provider = self.provider.handle()?;
        let addresses = self.repository.list_active_addresses(self.network).await?;
        tracing::Span::current().record("addresses", addresses.len());

        let mut recorded = 0;
        for watched in &addresses {
            match self.scan_address(provider.as_ref(), watched).await {
                Ok(count) => recorded += count,
                Err(e) => warn!(
                    address = %watched.address,
                    error = %e,
                    "Address scan failed, continuing with next address"
                ),
            }
        }

        debug!(recorded, "Address scan complete");
        Ok(recorded)
    }
}
