//! Configuration management for the Cardano watcher.
//!
//! This module handles loading and validating configuration from environment variables
//! using the `dotenvy` crate. All operations return [`WatcherResult`] for comprehensive
//! error handling.
//!
//! ## Environment Variables
//!
//! Optional (with defaults):
//! - `CARDANO_NETWORK`: `mainnet`, `preprod` or `preview` (default: preprod)
//! - `BLOCKFROST_PROJECT_ID`: Blockfrost project id (required before polling starts)
//! - `BLOCKFROST_URL`: Override the provider base URL
//! - `AUTO_START`: Start polling when the service boots (default: true)
//! - `ADDRESS_POLLING_ENABLED` / `ADDRESS_POLLING_INTERVAL_SECS` (default: true / 30)
//! - `TRANSACTION_POLLING_ENABLED` / `TRANSACTION_POLLING_INTERVAL_SECS` (default: true / 60)
//! - `PROVIDER_TIMEOUT_SECS`: HTTP timeout for provider calls (default: 30)
//! - `PROVIDER_MAX_RETRIES`: Retries for retryable provider failures (default: 3)
//! - `PROVIDER_RETRY_DELAY_MS`: Linear backoff base (default: 500)
//! - `DATABASE_URL`: SQLite database URL (default: "sqlite:./watcher.db")
//! - `API_PORT`: Admin API port (default: 3000)
//! - `RATE_LIMIT_RPM`: Admin API requests per minute (default: 120)
//! - `CORS_ORIGINS`: Comma-separated allowed origins (default: "*")
//! - `RUST_LOG`: Logging level (default: "info")
//!
//! ## Example
//!
//! ```no_run
//! use cardano_watcher::config::Config;
//! use cardano_watcher::error::WatcherResult;
//!
//! # fn main() -> WatcherResult<()> {
//! let config = Config::from_env()?;
//! println!("Network: {}", config.network());
//! # Ok(())
//! # }
//! ```

use crate::error::{WatcherError, WatcherResult};
use serde::Serialize;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Cardano network the watcher is pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Cardano mainnet
    Mainnet,
    /// Pre-production testnet
    Preprod,
    /// Preview testnet
    Preview,
}

impl Network {
    /// Lowercase network tag stored alongside every row.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Preprod => "preprod",
            Self::Preview => "preview",
        }
    }

    /// Default Blockfrost endpoint for this network.
    #[must_use]
    pub const fn blockfrost_url(self) -> &'static str {
        match self {
            Self::Mainnet => "https://cardano-mainnet.blockfrost.io/api/v0",
            Self::Preprod => "https://cardano-preprod.blockfrost.io/api/v0",
            Self::Preview => "https://cardano-preview.blockfrost.io/api/v0",
        }
    }

    /// Bech32 human-readable prefixes accepted for addresses on this network.
    #[must_use]
    pub const fn address_prefixes(self) -> &'static [&'static str] {
        match self {
            Self::Mainnet => &["addr1", "stake1"],
            Self::Preprod | Self::Preview => &["addr_test1", "stake_test1"],
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = WatcherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "preprod" => Ok(Self::Preprod),
            "preview" => Ok(Self::Preview),
            other => Err(WatcherError::config(
                format!("CARDANO_NETWORK must be mainnet, preprod or preview, got: {other}"),
                None,
            )),
        }
    }
}

/// Settings for one polling path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PollingSettings {
    /// Whether the path starts with the supervisor
    pub enabled: bool,
    /// Time between scheduled scans
    #[serde(rename = "interval_secs", serialize_with = "serialize_secs")]
    pub interval: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl PollingSettings {
    /// Creates polling settings.
    #[must_use]
    pub const fn new(enabled: bool, interval: Duration) -> Self {
        Self { enabled, interval }
    }
}

/// Settings consumed by the provider client.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Network the provider serves
    pub network: Network,
    /// Blockfrost project id
    pub project_id: Option<String>,
    /// Base URL override
    pub base_url: Option<String>,
    /// HTTP timeout per request
    pub timeout: Duration,
    /// Retries for retryable failures
    pub max_retries: u32,
    /// Linear backoff base between retries
    pub retry_delay: Duration,
}

impl ProviderSettings {
    /// Creates provider settings with default timeout and retry policy.
    #[must_use]
    pub const fn new(network: Network, project_id: Option<String>) -> Self {
        Self {
            network,
            project_id,
            base_url: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
        }
    }

    /// Effective provider base URL.
    #[must_use]
    pub fn resolved_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.network.blockfrost_url())
    }
}

/// Main configuration struct for the watcher.
///
/// Contains all runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Provider network, credentials and retry policy
    provider: ProviderSettings,

    /// Start polling when the service boots
    auto_start: bool,

    /// Address polling path
    address_polling: PollingSettings,

    /// Transaction polling path
    transaction_polling: PollingSettings,

    /// SQLite database URL
    database_url: String,

    /// Admin API port
    api_port: u16,

    /// Admin API requests per minute
    rate_limit_rpm: u32,

    /// Allowed CORS origins
    cors_origins: Vec<String>,
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(name: &str, default: &str, expected: &str) -> WatcherResult<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_or(name, default).trim().parse::<T>().map_err(|e| {
        WatcherError::config(format!("{name} must be {expected}"), Some(Box::new(e)))
    })
}

fn parse_interval(name: &str, default: &str) -> WatcherResult<Duration> {
    let secs: u64 = parse_env(name, default, "a whole number of seconds")?;
    if secs == 0 {
        return Err(WatcherError::config(
            format!("{name} must be greater than zero"),
            None,
        ));
    }
    Ok(Duration::from_secs(secs))
}

impl Config {
    /// Creates a configuration with defaults for `network` and no credentials.
    ///
    /// # Example
    ///
    /// ```
    /// use cardano_watcher::config::{Config, Network};
    /// use std::time::Duration;
    ///
    /// let config = Config::new(Network::Preview)
    ///     .with_project_id("previewKey")
    ///     .with_address_polling(true, Duration::from_secs(10));
    /// assert_eq!(config.address_polling().interval, Duration::from_secs(10));
    /// ```
    #[must_use]
    pub fn new(network: Network) -> Self {
        Self {
            provider: ProviderSettings::new(network, None),
            auto_start: true,
            address_polling: PollingSettings::new(true, Duration::from_secs(30)),
            transaction_polling: PollingSettings::new(true, Duration::from_secs(60)),
            database_url: "sqlite:./watcher.db".to_string(),
            api_port: 3000,
            rate_limit_rpm: 120,
            cors_origins: vec!["*".to_string()],
        }
    }

    /// Load configuration from environment variables.
    ///
    /// This function:
    /// 1. Loads `.env` file using `dotenvy` (if present)
    /// 2. Reads and validates all environment variables
    /// 3. Applies defaults for optional variables
    ///
    /// A missing `BLOCKFROST_PROJECT_ID` is not an error here; the provider
    /// client reports it when polling is started.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `CARDANO_NETWORK` is not a known network
    /// - A boolean or numeric variable cannot be parsed
    /// - A polling interval is zero
    pub fn from_env() -> WatcherResult<Self> {
        // Load .env file if present (ignore error if file doesn't exist)
        dotenvy::dotenv().ok();

        let network: Network = env_or("CARDANO_NETWORK", "preprod").parse()?;

        let project_id = env::var("BLOCKFROST_PROJECT_ID")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && v != "your_project_id_here");

        let base_url = env::var("BLOCKFROST_URL")
            .ok()
            .map(|v| v.trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());

        if let Some(url) = &base_url {
            if !url.starts_with("http") {
                return Err(WatcherError::config(
                    format!("BLOCKFROST_URL must be an http(s) URL, got: {url}"),
                    None,
                ));
            }
        }

        let provider = ProviderSettings {
            network,
            project_id,
            base_url,
            timeout: Duration::from_secs(parse_env(
                "PROVIDER_TIMEOUT_SECS",
                "30",
                "a valid number",
            )?),
            max_retries: parse_env("PROVIDER_MAX_RETRIES", "3", "a valid number")?,
            retry_delay: Duration::from_millis(parse_env(
                "PROVIDER_RETRY_DELAY_MS",
                "500",
                "a valid number",
            )?),
        };

        let auto_start = parse_env("AUTO_START", "true", "'true' or 'false'")?;

        let address_polling = PollingSettings::new(
            parse_env("ADDRESS_POLLING_ENABLED", "true", "'true' or 'false'")?,
            parse_interval("ADDRESS_POLLING_INTERVAL_SECS", "30")?,
        );

        let transaction_polling = PollingSettings::new(
            parse_env("TRANSACTION_POLLING_ENABLED", "true", "'true' or 'false'")?,
            parse_interval("TRANSACTION_POLLING_INTERVAL_SECS", "60")?,
        );

        let database_url = env_or("DATABASE_URL", "sqlite:./watcher.db");
        let api_port = parse_env("API_PORT", "3000", "a valid port")?;
        let rate_limit_rpm = parse_env("RATE_LIMIT_RPM", "120", "a valid number")?;

        let cors_origins = env_or("CORS_ORIGINS", "*")
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            provider,
            auto_start,
            address_polling,
            transaction_polling,
            database_url,
            api_port,
            rate_limit_rpm,
            cors_origins,
        })
    }

    /// Sets the provider project id.
    #[must_use]
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.provider.project_id = Some(project_id.into());
        self
    }

    /// Sets the address polling path.
    #[must_use]
    pub const fn with_address_polling(mut self, enabled: bool, interval: Duration) -> Self {
        self.address_polling = PollingSettings::new(enabled, interval);
        self
    }

    /// Sets the transaction polling path.
    #[must_use]
    pub const fn with_transaction_polling(mut self, enabled: bool, interval: Duration) -> Self {
        self.transaction_polling = PollingSettings::new(enabled, interval);
        self
    }

    /// Sets whether polling starts with the service.
    #[must_use]
    pub const fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Sets the database URL.
    #[must_use]
    pub fn with_database_url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = database_url.into();
        self
    }

    /// Get the configured network.
    #[must_use]
    pub const fn network(&self) -> Network {
        self.provider.network
    }

    /// Get the provider settings.
    #[must_use]
    pub const fn provider(&self) -> &ProviderSettings {
        &self.provider
    }

    /// Check if polling starts automatically.
    #[must_use]
    pub const fn auto_start(&self) -> bool {
        self.auto_start
    }

    /// Get the address polling settings.
    #[must_use]
    pub const fn address_polling(&self) -> PollingSettings {
        self.address_polling
    }

    /// Get the transaction polling settings.
    #[must_use]
    pub const fn transaction_polling(&self) -> PollingSettings {
        self.transaction_polling
    }

    /// Get the database URL.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Get the admin API port.
    #[must_use]
    pub const fn api_port(&self) -> u16 {
        self.api_port
    }

    /// Get the admin API rate limit.
    #[must_use]
    pub const fn rate_limit_rpm(&self) -> u32 {
        self.rate_limit_rpm
    }

    /// Get the allowed CORS origins.
    #[must_use]
    pub fn cors_origins(&self) -> &[String] {
        &self.cors_origins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: &[&str] = &[
        "CARDANO_NETWORK",
        "BLOCKFROST_PROJECT_ID",
        "BLOCKFROST_URL",
        "ADDRESS_POLLING_INTERVAL_SECS",
        "TRANSACTION_POLLING_ENABLED",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    // Environment variables are process-global; keep every env-driven
    // assertion in one test so parallel test threads cannot interleave.
    #[test]
    fn test_config_from_env() {
        clear_env();

        env::set_var("CARDANO_NETWORK", "atlantis");
        assert!(Config::from_env().is_err());

        env::set_var("CARDANO_NETWORK", "Mainnet");
        env::set_var("ADDRESS_POLLING_INTERVAL_SECS", "0");
        assert!(Config::from_env().is_err());

        env::set_var("ADDRESS_POLLING_INTERVAL_SECS", "15");
        env::set_var("TRANSACTION_POLLING_ENABLED", "false");
        env::set_var("BLOCKFROST_PROJECT_ID", "your_project_id_here");
        let config = Config::from_env();
        assert!(config.is_ok());

        if let Ok(config) = config {
            assert_eq!(config.network(), Network::Mainnet);
            assert_eq!(config.address_polling().interval, Duration::from_secs(15));
            assert!(!config.transaction_polling().enabled);
            assert!(config.provider().project_id.is_none());
            assert_eq!(
                config.provider().resolved_base_url(),
                "https://cardano-mainnet.blockfrost.io/api/v0"
            );
        }

        env::set_var("BLOCKFROST_URL", "ftp://example.com");
        assert!(Config::from_env().is_err());

        clear_env();
    }

    #[test]
    fn test_network_parsing() {
        assert_eq!("preview".parse::<Network>().ok(), Some(Network::Preview));
        assert_eq!(" PREPROD ".parse::<Network>().ok(), Some(Network::Preprod));
        assert!("testnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_address_prefixes() {
        assert!(Network::Mainnet.address_prefixes().contains(&"addr1"));
        assert!(Network::Preprod.address_prefixes().contains(&"addr_test1"));
    }

    #[test]
    fn test_builder_defaults() {
        let config = Config::new(Network::Preprod)
            .with_project_id("key")
            .with_transaction_polling(false, Duration::from_secs(5));

        assert!(config.auto_start());
        assert_eq!(config.address_polling().interval, Duration::from_secs(30));
        assert!(!config.transaction_polling().enabled);
        assert_eq!(config.provider().project_id.as_deref(), Some("key"));
    }
}
