//! Persistent storage for watch lists and detected events.
//!
//! This module provides SQLite-based storage for:
//! - Watched addresses and their block checkpoints
//! - Tracked transaction submissions and their status
//! - The append-only log of detected blockchain events
//!
//! # Architecture
//!
//! - `models`: Row types that map to database tables
//! - `repository`: Queries and the transactional state transitions
//! - Connection pooling with SQLite WAL mode so API reads never block a scan
//! - Embedded migrations from `migrations/`

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::WatcherError;

pub mod models;
pub mod repository;

pub use repository::Repository;

const REQUIRED_TABLES: [&str; 3] = [
    "watched_addresses",
    "transaction_submissions",
    "blockchain_events",
];

/// Creates a SQLite connection pool and brings the schema up to date.
///
/// # Configuration
///
/// - **WAL mode**: Readers proceed while a scan commits
/// - **Busy timeout**: 30 seconds to ride out lock contention
/// - **Foreign keys**: Enforced on every connection
/// - **Max connections**: 5
///
/// # Example
///
/// ```no_run
/// use cardano_watcher::db::create_pool;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool("sqlite:./watcher.db").await?;
///     Ok(())
/// }
/// ```
///
/// # Errors
///
/// Returns [`WatcherError::DatabaseError`] if the URL is invalid, the
/// database cannot be opened, or migrations fail.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, WatcherError> {
    info!(database_url, "Connecting to database");

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| {
            WatcherError::database(
                format!("Failed to parse database URL: {database_url}"),
                Some(Box::new(e)),
            )
        })?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
        .map_err(|e| {
            WatcherError::database(
                format!("Failed to connect to database at {database_url}"),
                Some(Box::new(e)),
            )
        })?;

    info!("Running database migrations");
    run_migrations(&pool).await?;
    verify_database(&pool).await?;
    info!("Database migrations complete");

    Ok(pool)
}

/// Applies all pending migrations from the `migrations/` directory.
///
/// # Errors
///
/// Returns [`WatcherError::DatabaseError`] if a migration fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), WatcherError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| {
            WatcherError::database("Failed to run database migrations", Some(Box::new(e)))
        })?;

    Ok(())
}

/// Verify that required tables exist after migrations.
///
/// # Errors
///
/// Returns [`WatcherError::DatabaseError`] when a table is missing.
pub async fn verify_database(pool: &SqlitePool) -> Result<(), WatcherError> {
    let rows = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT name FROM sqlite_master
        WHERE type = 'table'
          AND name IN ('watched_addresses', 'transaction_submissions', 'blockchain_events')
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| WatcherError::database("Failed to verify database schema", Some(Box::new(e))))?;

    if rows.len() < REQUIRED_TABLES.len() {
        let missing: Vec<&str> = REQUIRED_TABLES
            .iter()
            .copied()
            .filter(|t| !rows.iter().any(|(name,)| name == t))
            .collect();
        return Err(WatcherError::database(
            format!("Database schema incomplete, missing: {}", missing.join(", ")),
            None,
        ));
    }

    Ok(())
}
