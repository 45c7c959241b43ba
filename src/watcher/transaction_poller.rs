//! Transaction path: confirms tracked submissions.
//!
//! A submission moves `PENDING -> CONFIRMED` at most once. The transition and
//! its event are one conditional write, so overlapping scans produce a single
//! event and a single `transactionConfirmed` notification.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::{Poller, PollingPath, ScanFlag};
use crate::config::Network;
use crate::db::models::{TransactionSubmissionRecord, TransitionOutcome};
use crate::db::Repository;
use crate::error::WatcherResult;
use crate::notification::{emit_best_effort, Notification, NotificationSink};
use crate::provider::{ChainProvider, ProviderClient};

/// Polls the provider for tracked submissions.
pub struct TransactionPoller {
    repository: Repository,
    provider: Arc<ProviderClient>,
    sink: Arc<dyn NotificationSink>,
    network: Network,
    scanning: ScanFlag,
}

impl TransactionPoller {
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

    /// Processes one submission; `true` when it was confirmed by this call.
    async fn check_submission(
        &self,
        provider: &dyn ChainProvider,
        submission: &TransactionSubmissionRecord,
    ) -> WatcherResult<bool> {
        let tx_hash = submission.tx_hash.as_str();

        if submission.status()?.is_terminal() {
            if self.repository.deactivate_settled_submission(tx_hash).await? {
                info!(tx_hash, status = %submission.status, "Deactivated settled submission");
            }
            return Ok(false);
        }

        let found = match provider.fetch_transaction(tx_hash).await {
            Ok(found) => found,
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        };

        let Some(found) = found else {
            debug!(tx_hash, "Submission not on-chain yet");
            self.repository.touch_submission(tx_hash).await?;
            return Ok(false);
        };

        match self
            .repository
            .confirm_submission(tx_hash, self.network, &found)
            .await?
        {
            TransitionOutcome::Confirmed => {
                info!(
                    tx_hash,
                    block_height = found.block_height,
                    confirmations = found.confirmations,
                    "Submission confirmed"
                );
                emit_best_effort(
                    self.sink.as_ref(),
                    &Notification::TransactionConfirmed {
                        tx_hash: tx_hash.to_string(),
                        block_height: found.block_height,
                        confirmations: found.confirmations,
                    },
                );
                Ok(true)
            }
            TransitionOutcome::Deactivated => {
                info!(tx_hash, "Deactivated settled submission");
                Ok(false)
            }
            TransitionOutcome::Unchanged => Ok(false),
        }
    }
}

#[async_trait]
impl Poller for TransactionPoller {
    fn path(&self) -> PollingPath {
        PollingPath::Transaction
    }

    fn scan_flag(&self) -> &ScanFlag {
        &self.scanning
    }

    #[instrument(name = "transaction_scan", skip(self), fields(submissions = tracing::field::Empty))]
    async fn scan(&self) -> WatcherResult<usize> {
        let provider = self.provider.handle()?;
        let submissions = self.repository.list_active_submissions(self.network).await?;
        tracing::Span::current().record("submissions", submissions.len());

        let mut confirmed = 0;
        for submission in &submissions {
            match self.check_submission(provider.as_ref(), submission).await {
                Ok(true) => confirmed += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    tx_hash = %submission.tx_hash,
                    error = %e,
                    "Submission check failed, continuing with next submission"
                ),
            }
        }

        debug!(confirmed, "Transaction scan complete");
        Ok(confirmed)
    }
}
