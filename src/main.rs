//! CLI entry point for the Cardano watcher.
//!
//! ```text
//! main.rs (runtime + tracing)
//!     ↓
//! cli.rs (command dispatch, colored output)
//!     ↓
//! config → db → provider → watcher → api
//! ```

use cardano_watcher::{cli, observability};
use tracing::error;

/// Entry point.
///
/// Logging is controlled by `RUST_LOG`, `LOG_JSON` and `LOG_FILE`:
///
/// ```bash
/// RUST_LOG=cardano_watcher=debug,sqlx=warn cardano-watcher run
/// LOG_JSON=true LOG_FILE=./logs/watcher.log cardano-watcher run
/// ```
#[tokio::main]
async fn main() {
    // Read before the config layer so `.env` can set them too.
    let _ = dotenvy::dotenv();

    let log_level = std::env::var("RUST_LOG").ok();
    let log_file = std::env::var("LOG_FILE")
        .ok()
        .filter(|f| !f.is_empty())
        .map(std::path::PathBuf::from);
    let json_output = std::env::var("LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    let _tracing = match observability::init_tracing(log_level, log_file, json_output) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize tracing: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = cli::run().await {
        error!(error = %e, "Application error");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
