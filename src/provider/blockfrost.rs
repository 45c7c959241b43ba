//! Blockfrost REST implementation of [`ChainProvider`].
//!
//! Endpoints used:
//!
//! - `GET /blocks/latest` for the chain tip
//! - `GET /addresses/{address}/transactions` for address activity
//! - `GET /txs/{hash}` for transaction details
//!
//! Every request goes through [`BlockfrostProvider::get_json`], which applies
//! the HTTP timeout, normalizes failures and retries the retryable ones with a
//! linear backoff plus jitter.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use super::{
    normalize_failure, ChainProvider, ProviderError, ProviderFailure, TxSummary,
    MAX_ACTIVITY_PAGE,
};
use crate::config::ProviderSettings;
use crate::error::{WatcherError, WatcherResult};

/// Blockfrost-backed provider.
pub struct BlockfrostProvider {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    max_retries: u32,
    retry_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct LatestBlock {
    height: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AddressTransaction {
    tx_hash: String,
    block_height: u64,
}

#[derive(Debug, Deserialize)]
struct AmountEntry {
    unit: String,
    quantity: String,
}

#[derive(Debug, Deserialize)]
struct TransactionContent {
    hash: String,
    block: String,
    block_height: u64,
    output_amount: Vec<AmountEntry>,
    fees: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl BlockfrostProvider {
    /// Builds a provider for `project_id` using the timeout, retry policy and
    /// base URL from `settings`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(project_id: &str, settings: &ProviderSettings) -> WatcherResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("cardano-watcher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                WatcherError::config("Failed to build provider HTTP client", Some(Box::new(e)))
            })?;

        Ok(Self {
            client,
            base_url: settings.resolved_base_url().trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            max_retries: settings.max_retries,
            retry_delay: settings.retry_delay,
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let mut attempt = 0;

        loop {
            match self.try_get(path, query).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(path, attempt, "Provider call succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(err) if err.retryable && attempt < self.max_retries => {
                    attempt += 1;
                    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..100));
                    let delay = self.retry_delay * attempt + jitter;
                    warn!(
                        path,
                        attempt,
                        max_retries = self.max_retries,
                        delay = ?delay,
                        error = %err,
                        "Provider call failed, retrying"
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn try_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{path}", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("project_id", &self.project_id)
            .query(query)
            .send()
            .await
            .map_err(|e| normalize_failure(transport_failure(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(normalize_failure(ProviderFailure::Http {
                status: status.as_u16(),
                message: error_message(status, &body),
            }));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| normalize_failure(transport_failure(&e)))
    }

    async fn transaction_content(&self, hash: &str) -> Result<TransactionContent, ProviderError> {
        self.get_json(&format!("/txs/{hash}"), &[]).await
    }
}

fn transport_failure(err: &reqwest::Error) -> ProviderFailure {
    let message = if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection refused: {err}")
    } else {
        err.to_string()
    };
    ProviderFailure::Transport { message }
}

/// Extracts the human message from a Blockfrost error body.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected provider response")
                .to_string()
        })
}

fn parse_quantity(quantity: &str) -> Result<u64, ProviderError> {
    quantity
        .parse::<u64>()
        .map_err(|_| ProviderError::failed(format!("invalid lovelace quantity: {quantity}")))
}

fn lovelace_output(amounts: &[AmountEntry]) -> Result<u64, ProviderError> {
    amounts
        .iter()
        .filter(|a| a.unit == "lovelace")
        .try_fold(0_u64, |acc, a| Ok(acc.saturating_add(parse_quantity(&a.quantity)?)))
}

/// Query parameters for an address activity page.
///
/// With a checkpoint the page walks forward from the first block after it;
/// without one it returns the newest page.
fn activity_query(since_block: Option<u64>) -> Vec<(&'static str, String)> {
    let mut query = vec![("count", MAX_ACTIVITY_PAGE.to_string())];
    match since_block {
        Some(since) => {
            query.push(("order", "asc".to_string()));
            query.push(("from", since.saturating_add(1).to_string()));
        }
        None => query.push(("order", "desc".to_string())),
    }
    query
}

fn summarize(content: TransactionContent, latest_height: u64) -> Result<TxSummary, ProviderError> {
    Ok(TxSummary {
        amount: lovelace_output(&content.output_amount)?,
        fee: parse_quantity(&content.fees)?,
        confirmations: TxSummary::confirmations_at(content.block_height, latest_height),
        tx_hash: content.hash,
        block_height: content.block_height,
        block_hash: content.block,
        observed_at: chrono::Utc::now(),
    })
}

#[async_trait]
impl ChainProvider for BlockfrostProvider {
    #[instrument(skip(self), fields(count = tracing::field::Empty))]
    async fn fetch_address_activity(
        &self,
        address: &str,
        since_block: Option<u64>,
    ) -> Result<Vec<TxSummary>, ProviderError> {
        let listing: Vec<AddressTransaction> = match self
            .get_json(
                &format!("/addresses/{address}/transactions"),
                &activity_query(since_block),
            )
            .await
        {
            Ok(listing) => listing,
            // Blockfrost answers 404 for addresses it has never seen on-chain.
            Err(err) if err.is_not_found() => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let mut fresh: Vec<AddressTransaction> = listing
            .into_iter()
            .filter(|tx| since_block.map_or(true, |since| tx.block_height > since))
            .take(MAX_ACTIVITY_PAGE)
            .collect();

        if fresh.is_empty() {
            return Ok(Vec::new());
        }
        fresh.sort_by_key(|tx| tx.block_height);

        let latest_height = self.latest_block_height().await?;
        let mut summaries = Vec::with_capacity(fresh.len());
        for tx in fresh {
            let content = self.transaction_content(&tx.tx_hash).await?;
            summaries.push(summarize(content, latest_height)?);
        }

        tracing::Span::current().record("count", summaries.len());
        Ok(summaries)
    }

    #[instrument(skip(self))]
    async fn fetch_transaction(&self, hash: &str) -> Result<Option<TxSummary>, ProviderError> {
        let content = match self.transaction_content(hash).await {
            Ok(content) => content,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };

        let latest_height = self.latest_block_height().await?;
        summarize(content, latest_height).map(Some)
    }

    async fn latest_block_height(&self) -> Result<u64, ProviderError> {
        let block: LatestBlock = self.get_json("/blocks/latest", &[]).await?;
        block
            .height
            .ok_or_else(|| ProviderError::failed("latest block has no height"))
    }
}
