//! Shared small types for relay sessions (§4.D).

use super::error::{Error, Result};

/// Why a relay session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectCause {
    /// A prior call to `close()` on this session.
    Intentional,
    /// A socket error or the remote end closing the connection.
    Involuntary(String),
}

/// Lifecycle state of a single-relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Validates that every URL in `relays` parses and uses the `wss://` scheme.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] on the first URL that fails to parse or
/// does not use `wss://`.
pub fn validate_relay_urls(relays: &[String]) -> Result<Vec<url::Url>> {
    let mut urls = Vec::with_capacity(relays.len());
    for relay in relays {
        let url = url::Url::parse(relay).map_err(|e| Error::InvalidUrl(format!("{relay}: {e}")))?;
        if url.scheme() != "wss" {
            return Err(Error::InvalidUrl(format!("{relay}: must use wss://, not {}://", url.scheme())));
        }
        urls.push(url);
    }
    Ok(urls)
}
