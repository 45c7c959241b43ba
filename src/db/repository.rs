//! Repository pattern for database operations.
//!
//! Every state transition the pollers perform is a single SQLite transaction
//! scoped to one row, and every write is safe to repeat:
//!
//! - events are keyed by (source, tx hash, event type) and inserted with
//!   `ON CONFLICT DO NOTHING`
//! - checkpoints only move forward (`MAX(current, new)`)
//! - submission transitions are conditional on the row still being
//!   `PENDING` and active
//!
//! This is what lets a manual poll overlap a scheduled scan safely.

use chrono::Utc;
use serde_json::json;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, instrument};

use super::models::{
    height_to_db, BlockchainEventRecord, SubmissionStatus, TransactionSubmissionRecord,
    TransitionOutcome, WatchedAddressRecord, EVENT_SUBMISSION_FOUND, EVENT_TRANSACTION,
};
use crate::config::Network;
use crate::error::WatcherError;
use crate::provider::TxSummary;

/// Repository for database operations.
///
/// Wraps a SQLite connection pool. Cloning is cheap and shares the pool.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

const DEACTIVATE_SETTLED: &str = r#"
    UPDATE transaction_submissions
    SET active = 0, updated_at = ?
    WHERE tx_hash = ? AND status <> ? AND active = 1
"#;

fn db_err(message: &str) -> impl FnOnce(sqlx::Error) -> WatcherError + '_ {
    move |e| WatcherError::database(message, Some(Box::new(e)))
}

impl Repository {
    /// Creates a new repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>, WatcherError> {
        self.pool
            .begin()
            .await
            .map_err(db_err("Failed to start transaction"))
    }

    // ==================== WATCHED ADDRESSES ====================

    /// Adds an address to the watch list, or reactivates it.
    ///
    /// `from_block` seeds the checkpoint. Re-adding an existing address keeps
    /// the higher of the stored and the given checkpoint, and keeps the old
    /// description when none is given.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use cardano_watcher::config::Network;
    /// use cardano_watcher::db::{create_pool, Repository};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let repo = Repository::new(create_pool("sqlite:./watcher.db").await?);
    ///     let watched = repo
    ///         .add_watched_address("addr_test1qz2f", Some("treasury"), None, Network::Preprod)
    ///         .await?;
    ///     assert!(watched.active);
    ///     Ok(())
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the write fails.
    pub async fn add_watched_address(
        &self,
        address: &str,
        description: Option<&str>,
        from_block: Option<u64>,
        network: Network,
    ) -> Result<WatchedAddressRecord, WatcherError> {
        let now = Utc::now().timestamp();
        let from_block = from_block.map(height_to_db).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO watched_addresses
                (address, description, active, last_checked_block, network, created_at, updated_at)
            VALUES (?, ?, 1, ?, ?, ?, ?)
            ON CONFLICT (address) DO UPDATE SET
                active = 1,
                description = COALESCE(excluded.description, watched_addresses.description),
                last_checked_block = COALESCE(
                    MAX(watched_addresses.last_checked_block, excluded.last_checked_block),
                    watched_addresses.last_checked_block,
                    excluded.last_checked_block
                ),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(address)
        .bind(description)
        .bind(from_block)
        .bind(network.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to add watched address"))?;

        info!(address, network = %network, "Address added to watch list");

        self.get_watched_address(address).await?.ok_or_else(|| {
            WatcherError::database(format!("Watched address {address} vanished after insert"), None)
        })
    }

    /// Deactivates a watched address. Returns `false` if it was not active.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the write fails.
    pub async fn deactivate_watched_address(&self, address: &str) -> Result<bool, WatcherError> {
        let result = sqlx::query(
            "UPDATE watched_addresses SET active = 0, updated_at = ? WHERE address = ? AND active = 1",
        )
        .bind(Utc::now().timestamp())
        .bind(address)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to deactivate watched address"))?;

        Ok(result.rows_affected() > 0)
    }

    /// Retrieves a watched address.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the query fails.
    pub async fn get_watched_address(
        &self,
        address: &str,
    ) -> Result<Option<WatchedAddressRecord>, WatcherError> {
        sqlx::query_as::<_, WatchedAddressRecord>(
            "SELECT * FROM watched_addresses WHERE address = ?",
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to query watched address"))
    }

    /// Active watched addresses on `network`, oldest first.
    ///
    /// Rows tagged with another network are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the query fails.
    pub async fn list_active_addresses(
        &self,
        network: Network,
    ) -> Result<Vec<WatchedAddressRecord>, WatcherError> {
        sqlx::query_as::<_, WatchedAddressRecord>(
            r#"
            SELECT * FROM watched_addresses
            WHERE active = 1 AND network = ?
            ORDER BY created_at, address
            "#,
        )
        .bind(network.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list active addresses"))
    }

    /// All watched addresses including inactive ones.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the query fails.
    pub async fn list_addresses(&self) -> Result<Vec<WatchedAddressRecord>, WatcherError> {
        sqlx::query_as::<_, WatchedAddressRecord>(
            "SELECT * FROM watched_addresses ORDER BY created_at, address",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list watched addresses"))
    }

    /// Number of active watched addresses on `network`.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the query fails.
    pub async fn count_active_addresses(&self, network: Network) -> Result<i64, WatcherError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM watched_addresses WHERE active = 1 AND network = ?",
        )
        .bind(network.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to count active addresses"))?;
        Ok(count)
    }

    /// Sets the checkpoint of an address that has never been scanned.
    ///
    /// Returns `false` when the address already has a checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the write fails.
    pub async fn seed_checkpoint(&self, address: &str, height: u64) -> Result<bool, WatcherError> {
        let result = sqlx::query(
            r#"
            UPDATE watched_addresses
            SET last_checked_block = ?, updated_at = ?
            WHERE address = ? AND last_checked_block IS NULL
            "#,
        )
        .bind(height_to_db(height)?)
        .bind(Utc::now().timestamp())
        .bind(address)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to seed checkpoint"))?;

        Ok(result.rows_affected() > 0)
    }

    /// Records new activity for a watched address.
    ///
    /// In one transaction: inserts a `TRANSACTION` event per summary (skipping
    /// ones already recorded) and moves the checkpoint to the highest block
    /// seen, never backwards. Returns the hashes that were newly recorded, in
    /// input order.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if any write fails; nothing is
    /// committed in that case.
    #[instrument(skip(self, activity), fields(count = activity.len(), inserted = tracing::field::Empty))]
    pub async fn record_address_activity(
        &self,
        address: &str,
        network: Network,
        activity: &[TxSummary],
    ) -> Result<Vec<String>, WatcherError> {
        let Some(highest) = activity.iter().map(|tx| tx.block_height).max() else {
            debug!("No activity to record");
            return Ok(Vec::new());
        };

        let now = Utc::now().timestamp();
        let mut tx = self.begin().await?;
        let mut inserted = Vec::new();

        for summary in activity {
            let payload = serde_json::to_string(summary).map_err(|e| {
                WatcherError::database("Failed to serialize event payload", Some(Box::new(e)))
            })?;

            let result = sqlx::query(
                r#"
                INSERT INTO blockchain_events
                    (event_type, block_height, block_hash, tx_hash, payload, network,
                     processed, watched_address, created_at)
                VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(EVENT_TRANSACTION)
            .bind(height_to_db(summary.block_height)?)
            .bind(&summary.block_hash)
            .bind(&summary.tx_hash)
            .bind(payload)
            .bind(network.as_str())
            .bind(address)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                WatcherError::database(
                    format!("Failed to insert event for transaction {}", summary.tx_hash),
                    Some(Box::new(e)),
                )
            })?;

            if result.rows_affected() > 0 {
                inserted.push(summary.tx_hash.clone());
            }
        }

        sqlx::query(
            r#"
            UPDATE watched_addresses
            SET last_checked_block = MAX(COALESCE(last_checked_block, 0), ?),
                updated_at = ?
            WHERE address = ?
            "#,
        )
        .bind(height_to_db(highest)?)
        .bind(now)
        .bind(address)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to advance checkpoint"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit transaction"))?;

        tracing::Span::current().record("inserted", inserted.len());
        Ok(inserted)
    }

    // ==================== TRANSACTION SUBMISSIONS ====================

    /// Starts tracking a submitted transaction.
    ///
    /// Tracking a hash that is already known returns the existing row
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the write fails.
    pub async fn track_submission(
        &self,
        tx_hash: &str,
        description: Option<&str>,
        network: Network,
    ) -> Result<TransactionSubmissionRecord, WatcherError> {
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO transaction_submissions
                (tx_hash, description, active, status, confirmations, network, created_at, updated_at)
            VALUES (?, ?, 1, ?, 0, ?, ?, ?)
            ON CONFLICT (tx_hash) DO NOTHING
            "#,
        )
        .bind(tx_hash)
        .bind(description)
        .bind(SubmissionStatus::Pending.as_str())
        .bind(network.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to track submission"))?;

        if result.rows_affected() > 0 {
            info!(tx_hash, network = %network, "Submission tracked");
        }

        self.get_submission(tx_hash).await?.ok_or_else(|| {
            WatcherError::database(format!("Submission {tx_hash} vanished after insert"), None)
        })
    }

    /// Retrieves a tracked submission.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the query fails.
    pub async fn get_submission(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionSubmissionRecord>, WatcherError> {
        sqlx::query_as::<_, TransactionSubmissionRecord>(
            "SELECT * FROM transaction_submissions WHERE tx_hash = ?",
        )
        .bind(tx_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to query submission"))
    }

    /// Active submissions on `network`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the query fails.
    pub async fn list_active_submissions(
        &self,
        network: Network,
    ) -> Result<Vec<TransactionSubmissionRecord>, WatcherError> {
        sqlx::query_as::<_, TransactionSubmissionRecord>(
            r#"
            SELECT * FROM transaction_submissions
            WHERE active = 1 AND network = ?
            ORDER BY created_at, tx_hash
            "#,
        )
        .bind(network.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list active submissions"))
    }

    /// All submissions, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the query fails.
    pub async fn list_submissions(&self) -> Result<Vec<TransactionSubmissionRecord>, WatcherError> {
        sqlx::query_as::<_, TransactionSubmissionRecord>(
            "SELECT * FROM transaction_submissions ORDER BY created_at DESC, tx_hash",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list submissions"))
    }

    /// Number of active submissions on `network`.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the query fails.
    pub async fn count_active_submissions(&self, network: Network) -> Result<i64, WatcherError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM transaction_submissions WHERE active = 1 AND network = ?",
        )
        .bind(network.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to count active submissions"))?;
        Ok(count)
    }

    /// Stamps the time of the last provider lookup. Telemetry only.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the write fails.
    pub async fn touch_submission(&self, tx_hash: &str) -> Result<(), WatcherError> {
        sqlx::query("UPDATE transaction_submissions SET last_checked_at = ? WHERE tx_hash = ?")
            .bind(Utc::now().timestamp())
            .bind(tx_hash)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to stamp submission"))?;
        Ok(())
    }

    /// Transitions a submission to `CONFIRMED` with the on-chain details.
    ///
    /// The update only applies while the row is `PENDING` and active; the
    /// `TRANSACTION_SUBMISSION_FOUND` event is inserted in the same transaction
    /// and only when that update hit a row. A row that is already terminal but
    /// still active is deactivated instead.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if any write fails; nothing is
    /// committed in that case.
    #[instrument(skip(self, found), fields(block_height = found.block_height))]
    pub async fn confirm_submission(
        &self,
        tx_hash: &str,
        network: Network,
        found: &TxSummary,
    ) -> Result<TransitionOutcome, WatcherError> {
        let now = Utc::now().timestamp();
        let block_height = height_to_db(found.block_height)?;
        let confirmations = height_to_db(found.confirmations)?;
        let mut tx = self.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE transaction_submissions
            SET status = ?, active = 0, confirmations = ?, block_height = ?, block_hash = ?,
                last_checked_at = ?, updated_at = ?
            WHERE tx_hash = ? AND status = ? AND active = 1
            "#,
        )
        .bind(SubmissionStatus::Confirmed.as_str())
        .bind(confirmations)
        .bind(block_height)
        .bind(&found.block_hash)
        .bind(now)
        .bind(now)
        .bind(tx_hash)
        .bind(SubmissionStatus::Pending.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to confirm submission"))?
        .rows_affected();

        let outcome = if updated > 0 {
            let payload = json!({
                "txHash": found.tx_hash,
                "blockHeight": found.block_height,
                "blockHash": found.block_hash,
                "confirmations": found.confirmations,
                "amount": found.amount,
                "fee": found.fee,
            });

            sqlx::query(
                r#"
                INSERT INTO blockchain_events
                    (event_type, block_height, block_hash, tx_hash, payload, network,
                     processed, submission_hash, created_at)
                VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(EVENT_SUBMISSION_FOUND)
            .bind(block_height)
            .bind(&found.block_hash)
            .bind(tx_hash)
            .bind(payload.to_string())
            .bind(network.as_str())
            .bind(tx_hash)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to insert confirmation event"))?;

            TransitionOutcome::Confirmed
        } else {
            let deactivated = sqlx::query(DEACTIVATE_SETTLED)
                .bind(now)
                .bind(tx_hash)
                .bind(SubmissionStatus::Pending.as_str())
                .execute(&mut *tx)
                .await
                .map_err(db_err("Failed to deactivate settled submission"))?
                .rows_affected();

            if deactivated > 0 {
                TransitionOutcome::Deactivated
            } else {
                TransitionOutcome::Unchanged
            }
        };

        tx.commit()
            .await
            .map_err(db_err("Failed to commit transaction"))?;

        Ok(outcome)
    }

    /// Deactivates a submission that is already terminal but still active.
    ///
    /// Returns `false` when there was nothing to deactivate.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the write fails.
    pub async fn deactivate_settled_submission(&self, tx_hash: &str) -> Result<bool, WatcherError> {
        let result = sqlx::query(DEACTIVATE_SETTLED)
            .bind(Utc::now().timestamp())
            .bind(tx_hash)
            .bind(SubmissionStatus::Pending.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to deactivate settled submission"))?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks a pending submission as `FAILED` and stops polling it.
    ///
    /// Returns `false` when the submission is unknown or no longer pending.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the write fails.
    pub async fn mark_submission_failed(&self, tx_hash: &str) -> Result<bool, WatcherError> {
        let result = sqlx::query(
            r#"
            UPDATE transaction_submissions
            SET status = ?, active = 0, updated_at = ?
            WHERE tx_hash = ? AND status = ?
            "#,
        )
        .bind(SubmissionStatus::Failed.as_str())
        .bind(Utc::now().timestamp())
        .bind(tx_hash)
        .bind(SubmissionStatus::Pending.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to mark submission failed"))?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== EVENTS ====================

    /// Most recent events, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the query fails.
    pub async fn list_recent_events(
        &self,
        limit: i64,
    ) -> Result<Vec<BlockchainEventRecord>, WatcherError> {
        sqlx::query_as::<_, BlockchainEventRecord>(
            "SELECT * FROM blockchain_events ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to query recent events"))
    }

    /// Events recorded for one watched address, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the query fails.
    pub async fn events_for_address(
        &self,
        address: &str,
    ) -> Result<Vec<BlockchainEventRecord>, WatcherError> {
        sqlx::query_as::<_, BlockchainEventRecord>(
            "SELECT * FROM blockchain_events WHERE watched_address = ? ORDER BY id",
        )
        .bind(address)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to query address events"))
    }

    /// Events recorded for one submission.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the query fails.
    pub async fn events_for_submission(
        &self,
        tx_hash: &str,
    ) -> Result<Vec<BlockchainEventRecord>, WatcherError> {
        sqlx::query_as::<_, BlockchainEventRecord>(
            "SELECT * FROM blockchain_events WHERE submission_hash = ? ORDER BY id",
        )
        .bind(tx_hash)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to query submission events"))
    }

    /// Flags an event as handled by a downstream consumer.
    ///
    /// Returns `false` if no event has this id.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] if the write fails.
    pub async fn mark_event_processed(&self, id: i64) -> Result<bool, WatcherError> {
        let result = sqlx::query("UPDATE blockchain_events SET processed = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to mark event processed"))?;

        Ok(result.rows_affected() > 0)
    }

    /// Health check for database connectivity.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::DatabaseError`] when the database is unreachable.
    pub async fn health_check(&self) -> Result<(), WatcherError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_err("Database health check failed"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;

    const ADDR: &str = "addr_test1qz2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzer3jcu5d8ps7";
    const HASH: &str = "1e043f100dce12d107f679685acd2fc0610e10f72a92d412794c9773d11d8477";

    async fn setup_test_db() -> (Repository, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let url = format!("sqlite://{}", dir.path().join("repo.db").display());
        let pool = create_pool(&url).await.expect("Failed to create pool");
        (Repository::new(pool), dir)
    }

    fn summary(hash: &str, height: u64) -> TxSummary {
        TxSummary {
            tx_hash: hash.to_string(),
            block_height: height,
            block_hash: format!("block{height}"),
            amount: 1_000_000,
            fee: 170_000,
            confirmations: 2,
            observed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_add_and_reactivate_address() {
        let (repo, _dir) = setup_test_db().await;

        let added = repo
            .add_watched_address(ADDR, Some("treasury"), Some(500), Network::Preprod)
            .await
            .unwrap();
        assert!(added.active);
        assert_eq!(added.checkpoint(), Some(500));
        assert_eq!(repo.count_active_addresses(Network::Preprod).await.unwrap(), 1);

        assert!(repo.deactivate_watched_address(ADDR).await.unwrap());
        assert!(!repo.deactivate_watched_address(ADDR).await.unwrap());
        assert_eq!(repo.count_active_addresses(Network::Preprod).await.unwrap(), 0);

        // Reactivation never lowers the checkpoint and keeps the label.
        let again = repo
            .add_watched_address(ADDR, None, Some(100), Network::Preprod)
            .await
            .unwrap();
        assert!(again.active);
        assert_eq!(again.checkpoint(), Some(500));
        assert_eq!(again.description.as_deref(), Some("treasury"));
    }

    #[tokio::test]
    async fn test_seed_checkpoint_only_once() {
        let (repo, _dir) = setup_test_db().await;
        repo.add_watched_address(ADDR, None, None, Network::Preprod)
            .await
            .unwrap();

        assert!(repo.seed_checkpoint(ADDR, 900).await.unwrap());
        assert!(!repo.seed_checkpoint(ADDR, 950).await.unwrap());

        let stored = repo.get_watched_address(ADDR).await.unwrap().unwrap();
        assert_eq!(stored.checkpoint(), Some(900));
    }

    #[tokio::test]
    async fn test_record_activity_is_idempotent() {
        let (repo, _dir) = setup_test_db().await;
        repo.add_watched_address(ADDR, None, Some(1000), Network::Preprod)
            .await
            .unwrap();

        let activity = vec![summary("aa", 1001), summary("bb", 1003)];
        let first = repo
            .record_address_activity(ADDR, Network::Preprod, &activity)
            .await
            .unwrap();
        assert_eq!(first, vec!["aa".to_string(), "bb".to_string()]);

        let second = repo
            .record_address_activity(ADDR, Network::Preprod, &activity)
            .await
            .unwrap();
        assert!(second.is_empty());

        let stored = repo.get_watched_address(ADDR).await.unwrap().unwrap();
        assert_eq!(stored.checkpoint(), Some(1003));
        assert_eq!(repo.events_for_address(ADDR).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_checkpoint_never_moves_backwards() {
        let (repo, _dir) = setup_test_db().await;
        repo.add_watched_address(ADDR, None, Some(2000), Network::Preprod)
            .await
            .unwrap();

        repo.record_address_activity(ADDR, Network::Preprod, &[summary("cc", 1500)])
            .await
            .unwrap();

        let stored = repo.get_watched_address(ADDR).await.unwrap().unwrap();
        assert_eq!(stored.checkpoint(), Some(2000));
    }

    #[tokio::test]
    async fn test_confirm_submission_once() {
        let (repo, _dir) = setup_test_db().await;
        let tracked = repo
            .track_submission(HASH, Some("payout"), Network::Preprod)
            .await
            .unwrap();
        assert_eq!(tracked.status().unwrap(), SubmissionStatus::Pending);
        assert_eq!(repo.count_active_submissions(Network::Preprod).await.unwrap(), 1);

        let found = summary(HASH, 5000);
        let first = repo
            .confirm_submission(HASH, Network::Preprod, &found)
            .await
            .unwrap();
        assert_eq!(first, TransitionOutcome::Confirmed);

        let second = repo
            .confirm_submission(HASH, Network::Preprod, &found)
            .await
            .unwrap();
        assert_eq!(second, TransitionOutcome::Unchanged);

        let stored = repo.get_submission(HASH).await.unwrap().unwrap();
        assert_eq!(stored.status().unwrap(), SubmissionStatus::Confirmed);
        assert!(!stored.active);
        assert_eq!(stored.block_height, Some(5000));
        assert_eq!(stored.confirmations, 2);
        assert_eq!(repo.events_for_submission(HASH).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_confirmed_but_active_is_deactivated() {
        let (repo, _dir) = setup_test_db().await;
        repo.track_submission(HASH, None, Network::Preprod)
            .await
            .unwrap();
        sqlx::query("UPDATE transaction_submissions SET status = 'CONFIRMED' WHERE tx_hash = ?")
            .bind(HASH)
            .execute(repo.pool())
            .await
            .unwrap();

        let outcome = repo
            .confirm_submission(HASH, Network::Preprod, &summary(HASH, 5000))
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Deactivated);
        assert!(repo.events_for_submission(HASH).await.unwrap().is_empty());
        assert_eq!(repo.count_active_submissions(Network::Preprod).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_failed_and_retrack() {
        let (repo, _dir) = setup_test_db().await;
        repo.track_submission(HASH, None, Network::Preprod)
            .await
            .unwrap();

        assert!(repo.mark_submission_failed(HASH).await.unwrap());
        assert!(!repo.mark_submission_failed(HASH).await.unwrap());

        // Tracking again does not resurrect a terminal row.
        let again = repo
            .track_submission(HASH, None, Network::Preprod)
            .await
            .unwrap();
        assert_eq!(again.status().unwrap(), SubmissionStatus::Failed);
        assert!(!again.active);
    }

    #[tokio::test]
    async fn test_events_listing_and_processing() {
        let (repo, _dir) = setup_test_db().await;
        repo.add_watched_address(ADDR, None, Some(0), Network::Preprod)
            .await
            .unwrap();
        repo.record_address_activity(
            ADDR,
            Network::Preprod,
            &[summary("aa", 10), summary("bb", 11)],
        )
        .await
        .unwrap();

        let events = repo.list_recent_events(10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].tx_hash, "bb");
        assert_eq!(events[0].event_type, EVENT_TRANSACTION);

        assert!(repo.mark_event_processed(events[0].id).await.unwrap());
        assert!(!repo.mark_event_processed(9999).await.unwrap());

        let events = repo.list_recent_events(1).await.unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].processed);
    }

    #[tokio::test]
    async fn test_active_rows_are_scoped_to_network() {
        let (repo, _dir) = setup_test_db().await;
        repo.add_watched_address(ADDR, None, Some(10), Network::Preview)
            .await
            .unwrap();
        repo.track_submission(HASH, None, Network::Preview)
            .await
            .unwrap();

        assert!(repo.list_active_addresses(Network::Preprod).await.unwrap().is_empty());
        assert!(repo.list_active_submissions(Network::Preprod).await.unwrap().is_empty());
        assert_eq!(repo.count_active_addresses(Network::Preprod).await.unwrap(), 0);
        assert_eq!(repo.count_active_submissions(Network::Preprod).await.unwrap(), 0);

        assert_eq!(repo.list_active_addresses(Network::Preview).await.unwrap().len(), 1);
        assert_eq!(repo.list_active_submissions(Network::Preview).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_health_check() {
        let (repo, _dir) = setup_test_db().await;
        assert!(repo.health_check().await.is_ok());
    }
}
