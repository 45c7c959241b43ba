//! Dual-path polling watcher.
//!
//! Two independent pollers share one provider client and one repository:
//!
//! - [`AddressPoller`] records new activity on watched addresses
//! - [`TransactionPoller`] confirms tracked submissions
//!
//! [`WatcherSupervisor`] owns the lifecycle: one tokio task and interval per
//! path, independently startable and stoppable, plus on-demand polls.
//!
//! ```text
//!                 ┌────────────────────┐
//!                 │ WatcherSupervisor  │
//!                 └─────┬────────┬─────┘
//!         address task  │        │  transaction task
//!           ┌───────────▼──┐  ┌──▼──────────────────┐
//!           │ AddressPoller│  │ TransactionPoller   │
//!           └──────┬───────┘  └──────┬──────────────┘
//!                  │ ProviderClient  │
//!                  │ Repository      │
//!                  └── NotificationSink (after commit)
//! ```

pub mod address_poller;
pub mod guard;
pub mod supervisor;
pub mod transaction_poller;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::error::WatcherResult;

pub use address_poller::AddressPoller;
pub use guard::{ScanFlag, ScanGuard};
pub use supervisor::{PathStatus, PollSummary, StatusSnapshot, WatcherSupervisor};
pub use transaction_poller::TransactionPoller;

/// One of the two polling paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PollingPath {
    /// Watched address activity
    Address,
    /// Tracked submission confirmation
    Transaction,
}

impl PollingPath {
    /// Name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Transaction => "transaction",
        }
    }
}

impl fmt::Display for PollingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scan over every active row of one path.
#[async_trait]
pub trait Poller: Send + Sync + 'static {
    /// Path this poller serves.
    fn path(&self) -> PollingPath;

    /// Flag held by scheduled scans.
    fn scan_flag(&self) -> &ScanFlag;

    /// Scans every active row once and returns the number of state changes.
    ///
    /// Failures for a single row are logged and skipped; only failures that
    /// prevent the scan as a whole are returned.
    async fn scan(&self) -> WatcherResult<usize>;
}

/// Runs a scheduled scan unless one is already in flight for this path.
///
/// Returns `None` when the tick was skipped. Errors are logged here so the
/// caller only has to wait for the next tick.
pub async fn run_scheduled_scan(poller: &dyn Poller) -> Option<usize> {
    let Some(_guard) = poller.scan_flag().try_acquire() else {
        debug!(path = %poller.path(), "Previous scan still running, skipping tick");
        return None;
    };

    match poller.scan().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(path = %poller.path(), error = %e, "Scheduled scan failed");
            None
        }
    }
}
