//! Process-wide configuration (§6), validated eagerly at construction so a
//! misconfigured deployment fails at start-up rather than mid-flight.

use thiserror::Error;

use crate::crypto::Keypair;
use crate::relay::validate_relay_urls;

/// Lower bound of the caller-supplied response timeout (§6).
pub const MIN_TIMEOUT_MS: u64 = 1000;
/// Upper bound of the caller-supplied response timeout (§6).
pub const MAX_TIMEOUT_MS: u64 = 120_000;
/// Region used when no explicit KV region is configured.
pub const DEFAULT_KV_REGION: &str = "us-east-1";

/// Configuration failures, collapsing into [`crate::error::CoreError::ConfigInvalid`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("at least one relay URL is required")]
    NoRelays,

    #[error("invalid relay URL: {0}")]
    InvalidRelayUrl(#[from] crate::relay::Error),

    #[error("response timeout {0}ms must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}")]
    TimeoutOutOfRange(u64),
}

/// Result type for configuration parsing.
pub type Result<T> = std::result::Result<T, Error>;

/// Validated process-wide configuration (§6).
pub struct Config {
    /// Author identity. Not `Clone`/`Debug` — holds secret key material.
    pub identity: Keypair,
    /// `wss://` relay URLs, already schema-checked.
    pub relays: Vec<String>,
    /// Bound applied to every `request_response` call's `timeout_ms`.
    pub response_timeout_ms: u64,
    /// Name of the durable-store table/collection, if component H is used.
    pub durable_store_table: Option<String>,
    /// Deployment region for the durable store.
    pub kv_region: String,
}

impl Config {
    /// Builds a [`Config`] from raw caller-supplied values, validating all
    /// of §6's constraints eagerly.
    ///
    /// `private_key` may be 64-character hex or bech32 `nsec1...`, tried in
    /// that order (per the same strict-decode posture as
    /// [`Keypair::from_bech32`] — a bech32-shaped string that fails to
    /// decode is an error, never silently re-tried as hex).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPrivateKey`] if neither parse succeeds,
    /// [`Error::NoRelays`] if `relays` is empty, [`Error::InvalidRelayUrl`]
    /// if any entry is not a valid `wss://` URL, or
    /// [`Error::TimeoutOutOfRange`] if `response_timeout_ms` falls outside
    /// `[MIN_TIMEOUT_MS, MAX_TIMEOUT_MS]`.
    pub fn new(
        private_key: &str,
        relays: Vec<String>,
        response_timeout_ms: u64,
        durable_store_table: Option<String>,
        kv_region: Option<String>,
    ) -> Result<Self> {
        let identity = parse_private_key(private_key)?;

        if relays.is_empty() {
            return Err(Error::NoRelays);
        }
        validate_relay_urls(&relays)?;

        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&response_timeout_ms) {
            return Err(Error::TimeoutOutOfRange(response_timeout_ms));
        }

        Ok(Self {
            identity,
            relays,
            response_timeout_ms,
            durable_store_table,
            kv_region: kv_region.unwrap_or_else(|| DEFAULT_KV_REGION.to_string()),
        })
    }
}

fn parse_private_key(raw: &str) -> Result<Keypair> {
    if raw.starts_with("nsec1") {
        return Keypair::from_bech32(raw).map_err(|e| Error::InvalidPrivateKey(e.to_string()));
    }
    Keypair::from_hex(raw).map_err(|e| Error::InvalidPrivateKey(e.to_string()))
}
