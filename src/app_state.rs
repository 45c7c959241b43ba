//! Shared application state for the admin API and notification stream.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::SystemTime;

use crate::config::Network;
use crate::db::Repository;
use crate::notification::BroadcastSink;
use crate::watcher::WatcherSupervisor;

/// Shared application state for API handlers.
#[derive(Clone)]
pub struct AppState {
    /// Watcher lifecycle and polling control.
    pub supervisor: Arc<WatcherSupervisor>,
    /// Repository for direct reads and watch list edits.
    pub repository: Repository,
    /// Notification channel feeding the WebSocket stream.
    pub notifications: BroadcastSink,
    /// Number of connected stream clients.
    pub stream_clients: Arc<AtomicUsize>,
    /// Application start time for uptime tracking.
    pub start_time: SystemTime,
}

impl AppState {
    /// Create a new `AppState`.
    ///
    /// `notifications` must be the sink (or part of the fan-out) the
    /// supervisor's pollers emit through, otherwise the stream stays silent.
    #[must_use]
    pub fn new(supervisor: Arc<WatcherSupervisor>, notifications: BroadcastSink) -> Self {
        Self {
            repository: supervisor.repository().clone(),
            supervisor,
            notifications,
            stream_clients: Arc::new(AtomicUsize::new(0)),
            start_time: SystemTime::now(),
        }
    }

    /// Network the watcher runs against.
    #[must_use]
    pub fn network(&self) -> Network {
        self.supervisor.network()
    }
}
