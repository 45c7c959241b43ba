//! Structured logging setup.
//!
//! # Environment Configuration
//!
//! ```bash
//! # Component-specific levels
//! RUST_LOG=cardano_watcher=debug,sqlx=warn cargo run -- run
//!
//! # JSON console output for log aggregation
//! LOG_JSON=true cargo run -- run
//!
//! # Additional JSON file output with daily rotation
//! LOG_FILE=./logs/watcher.log cargo run -- run
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when neither `RUST_LOG` nor an explicit level is given.
pub const DEFAULT_FILTER: &str = "cardano_watcher=info,warn";

/// Keeps the background log writer alive; logs written to the file are
/// flushed when this is dropped.
#[must_use = "dropping the guard stops file logging"]
pub struct TracingGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize the tracing subscriber.
///
/// * `log_level` - filter directive used when `RUST_LOG` is unset
/// * `log_file` - optional path for an additional JSON log, rotated daily
/// * `json_output` - JSON console output instead of the pretty format
///
/// # Examples
///
/// ```no_run
/// use cardano_watcher::observability;
/// use std::path::PathBuf;
///
/// let _guard = observability::init_tracing(
///     Some("info".to_string()),
///     Some(PathBuf::from("./logs/watcher.log")),
///     true,
/// )?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init_tracing(
    log_level: Option<String>,
    log_file: Option<PathBuf>,
    json_output: bool,
) -> Result<TracingGuard, Box<dyn std::error::Error>> {
    let env_filter = std::env::var("RUST_LOG")
        .ok()
        .or(log_level)
        .map_or_else(|| EnvFilter::new(DEFAULT_FILTER), EnvFilter::new);

    let console_layer = if json_output {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .boxed()
    };

    let (file_layer, file_guard) = match log_file.as_deref() {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)?;

            let appender = tracing_appender::rolling::daily(
                dir,
                path.file_name().unwrap_or_else(|| OsStr::new("watcher.log")),
            );
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    info!(
        json_output,
        file_logging = log_file.is_some(),
        "Tracing initialized"
    );

    Ok(TracingGuard { _file: file_guard })
}
