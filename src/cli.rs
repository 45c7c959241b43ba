//! Command-line interface for the Cardano watcher.
//!
//! # Commands
//!
//! - `run`: Start the watcher and serve the admin API until Ctrl-C / SIGTERM
//! - `poll`: Run one poll of both paths and print what was detected
//! - `status`: Print the watcher status snapshot
//! - `watch` / `unwatch`: Manage watched addresses
//! - `track` / `fail`: Manage tracked submissions
//!
//! # Example
//!
//! ```bash
//! cardano-watcher watch addr_test1qz... --description treasury
//! cardano-watcher track 1e043f100dce12d107f679685acd2fc0610e10f72a92d412794c9773d11d8477
//! cardano-watcher run
//! ```

use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use crate::api::server::run_server;
use crate::app_state::AppState;
use crate::config::Config;
use crate::db::models::TransactionSubmissionRecord;
use crate::db::{create_pool, Repository};
use crate::error::WatcherResult;
use crate::notification::{BroadcastSink, FanoutSink, LogSink, NotificationSink};
use crate::provider::ProviderClient;
use crate::validation::{normalize_tx_hash, validate_address};
use crate::watcher::supervisor::shutdown_signal;
use crate::watcher::{PathStatus, WatcherSupervisor};

const STREAM_CAPACITY: usize = 256;

/// Cardano address and transaction watcher
#[derive(Parser, Debug)]
#[command(name = "cardano-watcher")]
#[command(about = "Dual-path Cardano address and transaction watcher", long_about = None)]
#[command(version)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start polling and serve the admin API
    Run,

    /// Poll both paths once and exit
    Poll,

    /// Show watcher status
    Status,

    /// Add an address to the watch list
    Watch {
        /// Bech32 address on the configured network
        address: String,

        /// Free-form label
        #[arg(short, long)]
        description: Option<String>,

        /// Only report activity after this block height (default: chain tip at first scan)
        #[arg(short, long)]
        from_block: Option<u64>,
    },

    /// Remove an address from the watch list
    Unwatch {
        /// Watched address
        address: String,
    },

    /// Track a submitted transaction until it is confirmed
    Track {
        /// Transaction hash (64 hex characters)
        hash: String,

        /// Free-form label
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Give up on a pending submission
    Fail {
        /// Transaction hash (64 hex characters)
        hash: String,
    },
}

/// Parse CLI arguments and execute the appropriate command.
///
/// # Errors
///
/// Returns an error if configuration loading, database access or the command
/// itself fails.
pub async fn run() -> WatcherResult<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Run => run_watcher(&config).await,
        Commands::Poll => run_poll(&config).await,
        Commands::Status => run_status(&config).await,
        Commands::Watch {
            address,
            description,
            from_block,
        } => run_watch(&config, &address, description.as_deref(), from_block).await,
        Commands::Unwatch { address } => run_unwatch(&config, &address).await,
        Commands::Track { hash, description } => {
            run_track(&config, &hash, description.as_deref()).await
        }
        Commands::Fail { hash } => run_fail(&config, &hash).await,
    }
}

async fn open_repository(config: &Config) -> WatcherResult<Repository> {
    Ok(Repository::new(create_pool(config.database_url()).await?))
}

async fn build_supervisor(
    config: &Config,
    sink: Arc<dyn NotificationSink>,
) -> WatcherResult<Arc<WatcherSupervisor>> {
    let repository = open_repository(config).await?;
    let provider = Arc::new(ProviderClient::new(config.provider().clone()));
    Ok(Arc::new(WatcherSupervisor::new(
        config, repository, provider, sink,
    )))
}

/// Execute the run command (long-running service).
async fn run_watcher(config: &Config) -> WatcherResult<()> {
    let broadcast = BroadcastSink::new(STREAM_CAPACITY);
    let sink = Arc::new(FanoutSink::new(vec![
        Arc::new(LogSink),
        Arc::new(broadcast.clone()),
    ]));
    let supervisor = build_supervisor(config, sink).await?;
    supervisor.install_shutdown_hook();

    println!(
        "{} {}",
        "🔭 Cardano watcher".cyan().bold(),
        format!("({})", config.network()).dimmed()
    );

    if config.auto_start() {
        match supervisor.start().await {
            Ok(()) => println!("{}", "✅ Polling started".green()),
            Err(e) => {
                // Keep serving so polling can be started once the provider is configured.
                warn!(error = %e, "Watcher did not start");
                println!("{} {}", "⚠️  Polling not started:".yellow().bold(), e);
            }
        }
    } else {
        info!("Auto-start disabled, waiting for an explicit start");
        println!("{}", "⏸  Auto-start disabled".yellow());
    }

    println!(
        "{} http://0.0.0.0:{}/swagger-ui",
        "📡 Admin API:".cyan(),
        config.api_port()
    );

    let state = AppState::new(Arc::clone(&supervisor), broadcast);
    run_server(
        state,
        config.api_port(),
        config.rate_limit_rpm(),
        config.cors_origins(),
        shutdown_signal(),
    )
    .await?;

    supervisor.stop().await;
    println!("{}", "👋 Shutdown complete".green().bold());
    Ok(())
}

/// Execute the poll command (one-time scan of both paths).
async fn run_poll(config: &Config) -> WatcherResult<()> {
    let supervisor = build_supervisor(config, Arc::new(LogSink)).await?;
    let summary = supervisor.manual_poll().await?;

    println!("{}", "Poll complete".bold());
    println!(
        "  {:<24} {}",
        "New transactions:".cyan(),
        summary.new_transactions
    );
    println!(
        "  {:<24} {}",
        "Confirmed submissions:".cyan(),
        summary.confirmed_transactions
    );
    println!("  {:<24} {}", "Total:".cyan(), summary.total.to_string().bold());
    Ok(())
}

fn print_path(name: &str, path: &PathStatus) {
    let state = if path.active {
        "active".green()
    } else if path.enabled {
        "stopped".yellow()
    } else {
        "disabled".dimmed()
    };
    println!(
        "  {:<24} {} (every {}s)",
        format!("{name}:").cyan(),
        state,
        path.interval_secs
    );
}

/// Execute the status command.
async fn run_status(config: &Config) -> WatcherResult<()> {
    let supervisor = build_supervisor(config, Arc::new(LogSink)).await?;
    let status = supervisor.status().await?;

    println!("{}", "Watcher status".bold());
    println!("  {:<24} {}", "Network:".cyan(), status.network);
    println!(
        "  {:<24} {}",
        "Provider configured:".cyan(),
        config.provider().project_id.is_some()
    );
    print_path("Address polling", &status.address_polling);
    print_path("Transaction polling", &status.transaction_polling);
    println!(
        "  {:<24} {}",
        "Watched addresses:".cyan(),
        status.active_addresses
    );
    println!(
        "  {:<24} {}",
        "Pending submissions:".cyan(),
        status.active_submissions
    );
    Ok(())
}

/// Execute the watch command.
async fn run_watch(
    config: &Config,
    address: &str,
    description: Option<&str>,
    from_block: Option<u64>,
) -> WatcherResult<()> {
    validate_address(address, config.network())?;
    let repository = open_repository(config).await?;

    let watched = repository
        .add_watched_address(address, description, from_block, config.network())
        .await?;

    println!("{} {}", "👀 Watching".green().bold(), watched.address);
    match watched.checkpoint() {
        Some(block) => println!("   reporting activity after block {block}"),
        None => println!("   reporting activity after the chain tip at the first scan"),
    }
    Ok(())
}

/// Execute the unwatch command.
async fn run_unwatch(config: &Config, address: &str) -> WatcherResult<()> {
    let repository = open_repository(config).await?;

    if repository.deactivate_watched_address(address).await? {
        println!("{} {}", "🛑 No longer watching".yellow().bold(), address);
    } else {
        println!("{} {}", "Not being watched:".dimmed(), address);
    }
    Ok(())
}

fn print_submission(submission: &TransactionSubmissionRecord) {
    println!("   status: {}", submission.status.bold());
    if let Some(height) = submission.block_height {
        println!(
            "   block {height}, {} confirmations",
            submission.confirmations
        );
    }
}

/// Execute the track command.
async fn run_track(config: &Config, hash: &str, description: Option<&str>) -> WatcherResult<()> {
    let tx_hash = normalize_tx_hash(hash)?;
    let repository = open_repository(config).await?;

    let submission = repository
        .track_submission(&tx_hash, description, config.network())
        .await?;

    println!("{} {}", "📬 Tracking".green().bold(), submission.tx_hash);
    print_submission(&submission);
    Ok(())
}

/// Execute the fail command.
async fn run_fail(config: &Config, hash: &str) -> WatcherResult<()> {
    let tx_hash = normalize_tx_hash(hash)?;
    let repository = open_repository(config).await?;

    if repository.mark_submission_failed(&tx_hash).await? {
        println!("{} {}", "✖ Marked failed".red().bold(), tx_hash);
    } else {
        println!("{} {}", "Not pending:".dimmed(), tx_hash);
        if let Some(submission) = repository.get_submission(&tx_hash).await? {
            print_submission(&submission);
        }
    }
    Ok(())
}
