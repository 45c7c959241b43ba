//! Shared fixtures: a scripted provider, a recording sink and a temporary
//! database.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cardano_watcher::config::{Config, Network};
use cardano_watcher::db::{create_pool, Repository};
use cardano_watcher::error::{WatcherError, WatcherResult};
use cardano_watcher::notification::{Notification, NotificationSink};
use cardano_watcher::provider::{ChainProvider, ProviderClient, ProviderError, TxSummary};
use cardano_watcher::watcher::{AddressPoller, TransactionPoller, WatcherSupervisor};
use chrono::Utc;
use tempfile::TempDir;

pub const NETWORK: Network = Network::Preprod;

pub const ADDR_A: &str = "addr_test1qz2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzer3jcu5d8ps7zex2k";
pub const ADDR_B: &str = "addr_test1qrx3nw2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzer3jcu5d8ps7zlq9";
pub const ADDR_C: &str = "addr_test1qp5jxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzer3jcu5d8ps7zt4e";

pub const TX_ABC: &str = "abc0000000000000000000000000000000000000000000000000000000000001";
pub const TX_DEF: &str = "def0000000000000000000000000000000000000000000000000000000000002";

/// Builds a provider-side transaction summary.
pub fn summary(tx_hash: &str, block_height: u64, confirmations: u64) -> TxSummary {
    TxSummary {
        tx_hash: tx_hash.to_string(),
        block_height,
        block_hash: format!("{block_height:064x}"),
        amount: 5_000_000,
        fee: 170_000,
        confirmations,
        observed_at: Utc::now(),
    }
}

/// In-process [`ChainProvider`] answering from scripted data.
#[derive(Default)]
pub struct ScriptedProvider {
    tip: AtomicU64,
    activity: Mutex<HashMap<String, Vec<TxSummary>>>,
    address_failures: Mutex<HashMap<String, ProviderError>>,
    transactions: Mutex<HashMap<String, TxSummary>>,
    transaction_failures: Mutex<HashMap<String, ProviderError>>,
    unfiltered: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
    pub activity_calls: AtomicUsize,
    pub transaction_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(tip: u64) -> Arc<Self> {
        let provider = Self::default();
        provider.tip.store(tip, Ordering::SeqCst);
        Arc::new(provider)
    }

    pub fn set_tip(&self, tip: u64) {
        self.tip.store(tip, Ordering::SeqCst);
    }

    pub fn add_activity(&self, address: &str, tx: TxSummary) {
        self.activity
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default()
            .push(tx);
    }

    pub fn fail_address(&self, address: &str, err: ProviderError) {
        self.address_failures
            .lock()
            .unwrap()
            .insert(address.to_string(), err);
    }

    pub fn put_transaction(&self, tx: TxSummary) {
        self.transactions
            .lock()
            .unwrap()
            .insert(tx.tx_hash.clone(), tx);
    }

    pub fn fail_transaction(&self, hash: &str, err: ProviderError) {
        self.transaction_failures
            .lock()
            .unwrap()
            .insert(hash.to_string(), err);
    }

    /// Return scripted activity without applying the `since_block` filter.
    pub fn set_unfiltered(&self, unfiltered: bool) {
        *self.unfiltered.lock().unwrap() = unfiltered;
    }

    /// Delay every call, to keep scans in flight.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ChainProvider for ScriptedProvider {
    async fn fetch_address_activity(
        &self,
        address: &str,
        since_block: Option<u64>,
    ) -> Result<Vec<TxSummary>, ProviderError> {
        self.activity_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if let Some(err) = self.address_failures.lock().unwrap().get(address) {
            return Err(err.clone());
        }

        let unfiltered = *self.unfiltered.lock().unwrap();
        let mut txs: Vec<TxSummary> = self
            .activity
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|tx| unfiltered || since_block.map_or(true, |since| tx.block_height > since))
            .collect();
        txs.sort_by_key(|tx| tx.block_height);
        txs.truncate(100);
        Ok(txs)
    }

    async fn fetch_transaction(&self, hash: &str) -> Result<Option<TxSummary>, ProviderError> {
        self.transaction_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if let Some(err) = self.transaction_failures.lock().unwrap().get(hash) {
            return Err(err.clone());
        }
        Ok(self.transactions.lock().unwrap().get(hash).cloned())
    }

    async fn latest_block_height(&self) -> Result<u64, ProviderError> {
        Ok(self.tip.load(Ordering::SeqCst))
    }
}

/// Sink that keeps every notification it receives.
#[derive(Default)]
pub struct RecordingSink {
    received: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn received(&self) -> Vec<Notification> {
        self.received.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn emit(&self, notification: &Notification) -> WatcherResult<()> {
        self.received.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Sink whose every delivery fails.
pub struct FailingSink;

impl NotificationSink for FailingSink {
    fn emit(&self, _notification: &Notification) -> WatcherResult<()> {
        Err(WatcherError::notification("consumer unreachable"))
    }
}

/// Everything a test needs, wired the way the binary wires it.
pub struct Harness {
    pub config: Config,
    pub repository: Repository,
    pub provider: Arc<ScriptedProvider>,
    pub client: Arc<ProviderClient>,
    pub sink: Arc<RecordingSink>,
    _dir: TempDir,
}

impl Harness {
    /// Fresh database, scripted provider at `tip`, both paths polling every
    /// `interval`.
    pub async fn new(tip: u64, interval: Duration) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let url = format!("sqlite://{}", dir.path().join("watcher.db").display());

        let config = Config::new(NETWORK)
            .with_database_url(url)
            .with_address_polling(true, interval)
            .with_transaction_polling(true, interval);

        let pool = create_pool(config.database_url())
            .await
            .expect("Failed to create pool");
        let provider = ScriptedProvider::new(tip);
        let client = Arc::new(ProviderClient::with_provider(
            config.provider().clone(),
            provider.clone(),
        ));

        Self {
            config,
            repository: Repository::new(pool),
            provider,
            client,
            sink: Arc::new(RecordingSink::default()),
            _dir: dir,
        }
    }

    pub fn address_poller(&self) -> AddressPoller {
        self.address_poller_with(self.sink.clone())
    }

    pub fn address_poller_with(&self, sink: Arc<dyn NotificationSink>) -> AddressPoller {
        AddressPoller::new(
            self.repository.clone(),
            Arc::clone(&self.client),
            sink,
            NETWORK,
        )
    }

    pub fn transaction_poller(&self) -> TransactionPoller {
        self.transaction_poller_with(self.sink.clone())
    }

    pub fn transaction_poller_with(&self, sink: Arc<dyn NotificationSink>) -> TransactionPoller {
        TransactionPoller::new(
            self.repository.clone(),
            Arc::clone(&self.client),
            sink,
            NETWORK,
        )
    }

    pub fn supervisor(&self) -> Arc<WatcherSupervisor> {
        Arc::new(WatcherSupervisor::new(
            &self.config,
            self.repository.clone(),
            Arc::clone(&self.client),
            self.sink.clone(),
        ))
    }

    pub async fn watch(&self, address: &str, from_block: Option<u64>) {
        self.repository
            .add_watched_address(address, None, from_block, NETWORK)
            .await
            .expect("Failed to watch address");
    }

    pub async fn track(&self, hash: &str) {
        self.repository
            .track_submission(hash, None, NETWORK)
            .await
            .expect("Failed to track submission");
    }

    pub async fn checkpoint(&self, address: &str) -> Option<u64> {
        self.repository
            .get_watched_address(address)
            .await
            .unwrap()
            .and_then(|w| w.checkpoint())
    }

    pub async fn event_count(&self) -> usize {
        self.repository.list_recent_events(1000).await.unwrap().len()
    }
}

/// Polls `condition` until it holds or `timeout` elapses.
pub async fn eventually<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
