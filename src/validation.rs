//! Input checks for addresses and transaction hashes.

use crate::config::Network;
use crate::error::{WatcherError, WatcherResult};

/// Length of a hex-encoded transaction hash.
pub const TX_HASH_LEN: usize = 64;

/// Checks that `address` is a bech32 address for `network`.
///
/// Only the human-readable prefix and the data-part alphabet are checked; the
/// provider is the authority on whether the address exists.
///
/// # Errors
///
/// Returns [`WatcherError::ValidationError`] for an empty address, a prefix
/// from another network, or characters outside the bech32 alphabet.
pub fn validate_address(address: &str, network: Network) -> WatcherResult<()> {
    if address.is_empty() {
        return Err(WatcherError::validation("address must not be empty"));
    }

    let Some(prefix) = network
        .address_prefixes()
        .iter()
        .find(|p| address.starts_with(*p))
    else {
        return Err(WatcherError::validation(format!(
            "address {address} is not a {network} address (expected prefix {})",
            network.address_prefixes().join(" or ")
        )));
    };

    let data = &address[prefix.len()..];
    if data.is_empty() || !data.chars().all(is_bech32_char) {
        return Err(WatcherError::validation(format!(
            "address {address} is not valid bech32"
        )));
    }

    Ok(())
}

/// bech32 data characters: lowercase alphanumerics except `1`, `b`, `i`, `o`.
const fn is_bech32_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9') && !matches!(c, '1' | 'b' | 'i' | 'o')
}

/// Validates a transaction hash and returns it lowercased.
///
/// # Errors
///
/// Returns [`WatcherError::ValidationError`] unless `hash` is exactly 64 hex
/// characters.
pub fn normalize_tx_hash(hash: &str) -> WatcherResult<String> {
    let hash = hash.trim();
    if hash.len() != TX_HASH_LEN || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(WatcherError::validation(format!(
            "transaction hash must be {TX_HASH_LEN} hex characters, got '{hash}'"
        )));
    }
    Ok(hash.to_ascii_lowercase())
}
