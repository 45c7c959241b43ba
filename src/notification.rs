//! Watcher notifications and the sinks that deliver them.
//!
//! Pollers emit a [`Notification`] only after the corresponding rows are
//! committed. Delivery is best-effort: [`emit_best_effort`] logs a sink failure
//! and returns, so a broken consumer can never undo or block persistence.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::error::{WatcherError, WatcherResult};

/// A domain event emitted by the pollers.
///
/// Serializes as `{"event": <name>, "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum Notification {
    /// New activity was recorded for a watched address.
    #[serde(rename = "newTransactions")]
    NewTransactions {
        /// Watched address
        address: String,
        /// Number of newly recorded transactions
        count: usize,
        /// Hashes of the newly recorded transactions
        transactions: Vec<String>,
    },

    /// A tracked submission was found on-chain.
    #[serde(rename = "transactionConfirmed", rename_all = "camelCase")]
    TransactionConfirmed {
        /// Transaction hash
        tx_hash: String,
        /// Height of the including block
        block_height: u64,
        /// Confirmations at the time of detection
        confirmations: u64,
    },
}

impl Notification {
    /// Wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NewTransactions { .. } => "newTransactions",
            Self::TransactionConfirmed { .. } => "transactionConfirmed",
        }
    }
}

/// Destination for watcher notifications.
pub trait NotificationSink: Send + Sync {
    /// Delivers one notification.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::NotificationError`] when delivery fails.
    fn emit(&self, notification: &Notification) -> WatcherResult<()>;
}

/// Emits through `sink`, logging instead of propagating a failure.
pub fn emit_best_effort(sink: &dyn NotificationSink, notification: &Notification) {
    if let Err(e) = sink.emit(notification) {
        warn!(
            event = notification.name(),
            error = %e,
            "Notification delivery failed"
        );
    }
}

/// Writes every notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn emit(&self, notification: &Notification) -> WatcherResult<()> {
        match notification {
            Notification::NewTransactions {
                address, count, ..
            } => info!(event = notification.name(), address = %address, count, "Watcher notification"),
            Notification::TransactionConfirmed {
                tx_hash,
                block_height,
                confirmations,
            } => info!(
                event = notification.name(),
                tx_hash = %tx_hash,
                block_height,
                confirmations,
                "Watcher notification"
            ),
        }
        Ok(())
    }
}

/// Publishes notifications on a tokio broadcast channel.
///
/// Having no subscribers is not a failure; the notification is dropped.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastSink {
    /// Creates a sink with a channel buffering `capacity` notifications.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to future notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl NotificationSink for BroadcastSink {
    fn emit(&self, notification: &Notification) -> WatcherResult<()> {
        let _ = self.sender.send(notification.clone());
        Ok(())
    }
}

/// Forwards each notification to several sinks.
///
/// Every sink is attempted; the first failure is reported after all of them ran.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    /// Creates a fan-out over `sinks`.
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

impl NotificationSink for FanoutSink {
    fn emit(&self, notification: &Notification) -> WatcherResult<()> {
        let mut first_error: Option<WatcherError> = None;
        for sink in &self.sinks {
            if let Err(e) = sink.emit(notification) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
