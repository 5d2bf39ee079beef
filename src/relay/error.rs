//! Error types for relay connection operations.

use thiserror::Error;

/// Errors that can occur while opening or driving a relay session.
#[derive(Debug, Error)]
pub enum Error {
    /// Relay URL did not parse or was not `wss://`.
    #[error("invalid relay url '{0}'")]
    InvalidUrl(String),

    /// The WebSocket handshake failed.
    #[error("failed to connect to {url}: {reason}")]
    ConnectFailed { url: String, reason: String },

    /// Sending a frame on an open session failed.
    #[error("failed to send frame: {0}")]
    SendFailed(String),

    /// A relay sent something that doesn't parse as a wire message.
    #[error("relay protocol error: {0}")]
    Protocol(String),

    /// The session was already closed when an operation was attempted.
    #[error("session is closed")]
    Closed,
}

/// Result type for relay connection operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_display() {
        let err = Error::InvalidUrl("ws://insecure".to_string());
        assert_eq!(err.to_string(), "invalid relay url 'ws://insecure'");
    }

    #[test]
    fn connect_failed_display() {
        let err = Error::ConnectFailed { url: "wss://r".to_string(), reason: "refused".to_string() };
        assert_eq!(err.to_string(), "failed to connect to wss://r: refused");
    }

    #[test]
    fn closed_display() {
        assert_eq!(Error::Closed.to_string(), "session is closed");
    }
}
