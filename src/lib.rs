//! # Cardano Watcher
//!
//! Watches the Cardano blockchain along two independent polling paths:
//!
//! - **Address path**: reports new transactions touching watched addresses,
//!   tracking a per-address block checkpoint so each transaction is reported
//!   once.
//! - **Transaction path**: follows submitted transactions until they appear
//!   on-chain and records the `PENDING -> CONFIRMED` transition exactly once.
//!
//! Every detection is written to an append-only event log in SQLite and then
//! announced through a [`notification::NotificationSink`].
//!
//! ## Architecture
//!
//! 1. **Config** ([`config`]) - environment and builder configuration
//! 2. **Provider** ([`provider`]) - Blockfrost client with failure normalization
//! 3. **Storage** ([`db`]) - SQLite pool, migrations and idempotent transitions
//! 4. **Watcher** ([`watcher`]) - the two pollers and their supervisor
//! 5. **Notifications** ([`notification`]) - best-effort event delivery
//! 6. **Admin API** ([`api`]) - axum REST + WebSocket surface
//!
//! ## Using as a Library
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cardano_watcher::{
//!     config::Config, db::{create_pool, Repository}, notification::LogSink,
//!     provider::ProviderClient, watcher::WatcherSupervisor,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let repository = Repository::new(create_pool(config.database_url()).await?);
//!     let provider = Arc::new(ProviderClient::new(config.provider().clone()));
//!
//!     let supervisor = Arc::new(WatcherSupervisor::new(
//!         &config, repository, provider, Arc::new(LogSink),
//!     ));
//!     supervisor.install_shutdown_hook();
//!     supervisor.start().await?;
//!
//!     let poll = supervisor.manual_poll().await?;
//!     println!("detected {} changes", poll.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Setup
//!
//! ```text
//! CARDANO_NETWORK=preprod
//! BLOCKFROST_PROJECT_ID=preprodXXXXXXXXXXXXXXXX
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod api;
pub mod app_state;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod notification;
pub mod observability;
pub mod provider;
pub mod validation;
pub mod watcher;
