//! Relay connection layer (component D): single-relay WebSocket sessions
//! and the wire messages exchanged over them.
//!
//! ```text
//! connection.rs   RelayTransport / RelaySession, WebSocketTransport
//! wire.rs         ClientMessage, RelayMessage, parse_relay_message
//! types.rs        DisconnectCause, ConnectionState, validate_relay_urls
//! ```
//!
//! A session never reconnects on its own — [`crate::subscriber`] owns that
//! policy, per §4.D: "It MUST NOT auto-reconnect at this layer."

mod connection;
mod error;
mod types;
mod wire;

pub use connection::{RelaySession, RelayTransport, WebSocketTransport};
pub use error::{Error, Result};
pub use types::{validate_relay_urls, ConnectionState, DisconnectCause};
pub use wire::{parse_relay_message, ClientMessage, RelayMessage};

#[cfg(any(test, feature = "test-utils"))]
pub use connection::fake::{FakeRelayHandle, FakeTransport};
