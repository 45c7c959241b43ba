//! Watcher lifecycle: two independently controlled polling paths.
//!
//! Each path is either stopped or active. An active path owns a tokio task
//! driving an interval timer and a watch channel used to stop it. The
//! supervisor-level `running` flag is set by [`WatcherSupervisor::start`] or by
//! starting a single path, and cleared once no path is active any more.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::{run_scheduled_scan, AddressPoller, Poller, PollingPath, TransactionPoller};
use crate::config::{Config, Network, PollingSettings};
use crate::db::Repository;
use crate::error::WatcherResult;
use crate::notification::NotificationSink;
use crate::provider::ProviderClient;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

static SHUTDOWN_HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Runtime state of one polling path.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PathStatus {
    /// Whether the path's timer is running
    pub active: bool,
    /// Whether `start()` brings this path up
    pub enabled: bool,
    /// Timer period in seconds
    pub interval_secs: f64,
    /// Whether a scheduled scan is in flight
    pub scanning: bool,
}

/// Point-in-time view of the watcher.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Aggregate running flag
    pub running: bool,
    /// Configured network
    #[schema(value_type = String, example = "preprod")]
    pub network: Network,
    /// Whether the provider client is initialized
    pub provider_available: bool,
    /// Address path state
    pub address_polling: PathStatus,
    /// Transaction path state
    pub transaction_polling: PathStatus,
    /// Number of active watched addresses
    pub active_addresses: i64,
    /// Number of active tracked submissions
    pub active_submissions: i64,
}

/// Outcome of an on-demand poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    /// Address events newly recorded
    pub new_transactions: usize,
    /// Submissions confirmed
    pub confirmed_transactions: usize,
    /// Sum of both
    pub total: usize,
}

impl PollSummary {
    /// Combines the per-path counts.
    #[must_use]
    pub const fn new(new_transactions: usize, confirmed_transactions: usize) -> Self {
        Self {
            new_transactions,
            confirmed_transactions,
            total: new_transactions + confirmed_transactions,
        }
    }
}

struct PathTask {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// One path: its poller, its settings and the task driving it.
struct PathSlot {
    poller: Arc<dyn Poller>,
    settings: PollingSettings,
    task: Mutex<Option<PathTask>>,
}

impl PathSlot {
    fn new(poller: Arc<dyn Poller>, settings: PollingSettings) -> Self {
        Self {
            poller,
            settings,
            task: Mutex::new(None),
        }
    }

    fn path(&self) -> PollingPath {
        self.poller.path()
    }

    /// Starts the timer and runs one scan. `false` if already active.
    async fn start(&self) -> bool {
        {
            let mut task = self.task.lock().await;
            if task.is_some() {
                warn!(path = %self.path(), "Polling already active");
                return false;
            }
            *task = Some(spawn_path(
                Arc::clone(&self.poller),
                self.settings.interval,
            ));
        }

        info!(
            path = %self.path(),
            interval_secs = self.settings.interval.as_secs_f64(),
            "Polling started"
        );

        if let Some(count) = run_scheduled_scan(self.poller.as_ref()).await {
            debug!(path = %self.path(), count, "Initial scan complete");
        }
        true
    }

    /// Signals the task and waits for it to finish. `false` if not active.
    async fn stop(&self) -> bool {
        let Some(task) = self.task.lock().await.take() else {
            return false;
        };

        let _ = task.stop.send(true);
        if let Err(e) = task.handle.await {
            warn!(path = %self.path(), error = %e, "Polling task ended abnormally");
        }

        info!(path = %self.path(), "Polling stopped");
        true
    }

    async fn is_active(&self) -> bool {
        self.task.lock().await.is_some()
    }

    async fn status(&self) -> PathStatus {
        PathStatus {
            active: self.is_active().await,
            enabled: self.settings.enabled,
            interval_secs: self.settings.interval.as_secs_f64(),
            scanning: self.poller.scan_flag().is_busy(),
        }
    }
}

/// Spawns the timer task for one path.
///
/// The first tick fires one period after start; the caller runs the initial
/// scan itself. A stop request is observed between scans, never during one.
fn spawn_path(poller: Arc<dyn Poller>, interval: Duration) -> PathTask {
    let period = interval.max(MIN_INTERVAL);
    let (stop, mut stopped) = watch::channel(false);

    let handle = tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = stopped.changed() => break,
                _ = ticker.tick() => {
                    if let Some(count) = run_scheduled_scan(poller.as_ref()).await {
                        debug!(path = %poller.path(), count, "Scheduled scan complete");
                    }
                }
            }
        }

        debug!(path = %poller.path(), "Polling task exited");
    });

    PathTask { stop, handle }
}

/// Owns both polling paths and exposes the control operations.
pub struct WatcherSupervisor {
    network: Network,
    repository: Repository,
    provider: Arc<ProviderClient>,
    address: PathSlot,
    transaction: PathSlot,
    running: AtomicBool,
    lifecycle: Mutex<()>,
}

impl WatcherSupervisor {
    /// Builds both pollers over the shared repository, provider and sink.
    #[must_use]
    pub fn new(
        config: &Config,
        repository: Repository,
        provider: Arc<ProviderClient>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let network = config.network();
        let address_poller = AddressPoller::new(
            repository.clone(),
            Arc::clone(&provider),
            Arc::clone(&sink),
            network,
        );
        let transaction_poller =
            TransactionPoller::new(repository.clone(), Arc::clone(&provider), sink, network);

        Self {
            network,
            repository,
            provider,
            address: PathSlot::new(Arc::new(address_poller), config.address_polling()),
            transaction: PathSlot::new(
                Arc::new(transaction_poller),
                config.transaction_polling(),
            ),
            running: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
        }
    }

    /// Starts every enabled path.
    ///
    /// Initializes the provider first; each started path runs one scan before
    /// this returns. Calling it while running logs a warning and does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::WatcherError::ConfigError`] when the provider
    /// cannot be initialized; no path is started in that case.
    pub async fn start(&self) -> WatcherResult<()> {
        let _lifecycle = self.lifecycle.lock().await;

        if self.running.load(Ordering::Acquire) {
            warn!("Watcher already running");
            return Ok(());
        }

        self.provider.initialize().await?;
        self.running.store(true, Ordering::Release);
        info!(network = %self.network, "Starting watcher");

        for slot in [&self.address, &self.transaction] {
            if slot.settings.enabled {
                slot.start().await;
            } else {
                info!(path = %slot.path(), "Polling disabled by configuration");
            }
        }

        Ok(())
    }

    /// Stops both paths and clears the running flag. Idempotent.
    pub async fn stop(&self) {
        let _lifecycle = self.lifecycle.lock().await;

        self.address.stop().await;
        self.transaction.stop().await;

        if self.running.swap(false, Ordering::AcqRel) {
            info!("Watcher stopped");
        }
    }

    /// Starts the address path alone. Returns `false` if it was already active.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the provider cannot be initialized.
    pub async fn start_address_polling(&self) -> WatcherResult<bool> {
        self.start_path(PollingPath::Address).await
    }

    /// Stops the address path alone. Returns `false` if it was not active.
    pub async fn stop_address_polling(&self) -> bool {
        self.stop_path(PollingPath::Address).await
    }

    /// Starts the transaction path alone. Returns `false` if it was already
    /// active.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the provider cannot be initialized.
    pub async fn start_transaction_polling(&self) -> WatcherResult<bool> {
        self.start_path(PollingPath::Transaction).await
    }

    /// Stops the transaction path alone. Returns `false` if it was not active.
    pub async fn stop_transaction_polling(&self) -> bool {
        self.stop_path(PollingPath::Transaction).await
    }

    const fn slot(&self, path: PollingPath) -> &PathSlot {
        match path {
            PollingPath::Address => &self.address,
            PollingPath::Transaction => &self.transaction,
        }
    }

    async fn start_path(&self, path: PollingPath) -> WatcherResult<bool> {
        let _lifecycle = self.lifecycle.lock().await;

        self.provider.initialize().await?;
        let started = self.slot(path).start().await;
        if started {
            self.running.store(true, Ordering::Release);
        }
        Ok(started)
    }

    async fn stop_path(&self, path: PollingPath) -> bool {
        let _lifecycle = self.lifecycle.lock().await;

        let stopped = self.slot(path).stop().await;
        if !self.address.is_active().await
            && !self.transaction.is_active().await
            && self.running.swap(false, Ordering::AcqRel)
        {
            info!("No polling path active, watcher stopped");
        }
        stopped
    }

    /// Aggregate running flag.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Current state of both paths plus live row counts.
    ///
    /// # Errors
    ///
    /// Returns a database error if the counts cannot be read.
    pub async fn status(&self) -> WatcherResult<StatusSnapshot> {
        Ok(StatusSnapshot {
            running: self.is_running(),
            network: self.network,
            provider_available: self.provider.is_available(),
            address_polling: self.address.status().await,
            transaction_polling: self.transaction.status().await,
            active_addresses: self.repository.count_active_addresses(self.network).await?,
            active_submissions: self.repository.count_active_submissions(self.network).await?,
        })
    }

    /// Scans both paths once, outside the schedule.
    ///
    /// Does not wait for, or block, scheduled scans. Overlapping work is safe
    /// because every write is idempotent.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the provider cannot be initialized,
    /// or the first scan-level failure of either path.
    pub async fn manual_poll(&self) -> WatcherResult<PollSummary> {
        self.provider.initialize().await?;

        let (addresses, transactions) =
            tokio::join!(self.address.poller.scan(), self.transaction.poller.scan());
        let summary = PollSummary::new(addresses?, transactions?);

        info!(
            new_transactions = summary.new_transactions,
            confirmed_transactions = summary.confirmed_transactions,
            "Manual poll complete"
        );
        Ok(summary)
    }

    /// Stops this supervisor on Ctrl-C or SIGTERM.
    ///
    /// The hook is process-wide: only the first call in a process installs
    /// it and returns `true`; later calls, from any supervisor, return `false`.
    pub fn install_shutdown_hook(self: &Arc<Self>) -> bool {
        if SHUTDOWN_HOOK_INSTALLED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Shutdown hook already installed");
            return false;
        }

        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("Shutdown signal received, stopping watcher");
            supervisor.stop().await;
        });
        true
    }

    /// Configured network.
    #[must_use]
    pub const fn network(&self) -> Network {
        self.network
    }

    /// Shared repository.
    #[must_use]
    pub const fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Shared provider client.
    #[must_use]
    pub const fn provider(&self) -> &Arc<ProviderClient> {
        &self.provider
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
///
/// A listener that cannot be installed never resolves.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
