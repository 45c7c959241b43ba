//! Database models that map to SQL tables.
//!
//! Integer columns are stored as `i64` (SQLite's native integer); conversion
//! to chain heights happens at the repository boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::WatcherError;

/// Event type recorded for activity on a watched address.
pub const EVENT_TRANSACTION: &str = "TRANSACTION";

/// Event type recorded when a tracked submission is found on-chain.
pub const EVENT_SUBMISSION_FOUND: &str = "TRANSACTION_SUBMISSION_FOUND";

/// A watched Cardano address.
///
/// Maps to the `watched_addresses` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WatchedAddressRecord {
    /// Bech32 address
    pub address: String,
    /// Free-form label
    pub description: Option<String>,
    /// Inactive addresses are never scanned
    pub active: bool,
    /// Highest block height already scanned, `None` until the first scan
    pub last_checked_block: Option<i64>,
    /// Network the address was registered on
    pub network: String,
    /// Unix timestamp when the row was created
    pub created_at: i64,
    /// Unix timestamp of the last modification
    pub updated_at: i64,
}

impl WatchedAddressRecord {
    /// Checkpoint as a block height.
    #[must_use]
    pub fn checkpoint(&self) -> Option<u64> {
        self.last_checked_block.and_then(|b| u64::try_from(b).ok())
    }
}

/// Lifecycle state of a tracked submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    /// Submitted, not yet seen on-chain
    Pending,
    /// Found on-chain; terminal
    Confirmed,
    /// Given up on; terminal
    Failed,
}

impl SubmissionStatus {
    /// Column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Failed => "FAILED",
        }
    }

    /// Whether no further transition is allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = WatcherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "FAILED" => Ok(Self::Failed),
            other => Err(WatcherError::database(
                format!("Unknown submission status '{other}'"),
                None,
            )),
        }
    }
}

/// A transaction the operator submitted and wants confirmed.
///
/// Maps to the `transaction_submissions` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSubmissionRecord {
    /// Transaction hash (64 hex chars)
    pub tx_hash: String,
    /// Free-form label
    pub description: Option<String>,
    /// Inactive submissions are never polled
    pub active: bool,
    /// `PENDING`, `CONFIRMED` or `FAILED`
    pub status: String,
    /// Confirmations at the moment the confirmation was detected
    pub confirmations: i64,
    /// Height of the including block once confirmed
    pub block_height: Option<i64>,
    /// Hash of the including block once confirmed
    pub block_hash: Option<String>,
    /// Network the submission belongs to
    pub network: String,
    /// Unix timestamp of the last provider lookup
    pub last_checked_at: Option<i64>,
    /// Unix timestamp when the row was created
    pub created_at: i64,
    /// Unix timestamp of the last modification
    pub updated_at: i64,
}

impl TransactionSubmissionRecord {
    /// Parsed status column.
    ///
    /// # Errors
    ///
    /// Returns a database error for a value the schema should have rejected.
    pub fn status(&self) -> Result<SubmissionStatus, WatcherError> {
        self.status.parse()
    }
}

/// One entry of the append-only event log.
///
/// Maps to the `blockchain_events` table. At most one of
/// `watched_address` and `submission_hash` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainEventRecord {
    /// Database-assigned identifier
    pub id: i64,
    /// [`EVENT_TRANSACTION`] or [`EVENT_SUBMISSION_FOUND`]
    pub event_type: String,
    /// Height of the including block
    pub block_height: Option<i64>,
    /// Hash of the including block
    pub block_hash: Option<String>,
    /// Transaction the event is about
    pub tx_hash: String,
    /// JSON payload describing the transaction
    pub payload: String,
    /// Network the event was observed on
    pub network: String,
    /// Whether a downstream consumer has handled the event
    pub processed: bool,
    /// Source address, for address activity
    pub watched_address: Option<String>,
    /// Source submission, for confirmations
    pub submission_hash: Option<String>,
    /// Unix timestamp when the event was recorded
    pub created_at: i64,
}

/// Result of an attempted submission state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// PENDING became CONFIRMED and the event was recorded.
    Confirmed,
    /// Already terminal but still active; it was deactivated.
    Deactivated,
    /// Nothing changed (unknown hash, or inactive already).
    Unchanged,
}

/// Converts a chain height to its column representation.
pub(crate) fn height_to_db(height: u64) -> Result<i64, WatcherError> {
    i64::try_from(height)
        .map_err(|_| WatcherError::database(format!("Block height {height} out of range"), None))
}
