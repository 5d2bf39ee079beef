//! Multi-relay publisher (component E): fans a single event out to every
//! configured relay in parallel and aggregates the per-relay outcome.

mod error;

pub use error::{Error, Result};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::envelope::Event;
use crate::relay::{self, ClientMessage, RelayMessage, RelayTransport, WebSocketTransport};

/// Default time to wait for a relay's `OK` response (§4.E).
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Outcome of publishing to a single relay.
#[derive(Debug, Clone)]
pub struct RelayPublishResult {
    pub relay: String,
    pub ok: bool,
    pub err: Option<String>,
}

/// Aggregated outcome of a [`Publisher::publish`] call.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub per_relay: Vec<RelayPublishResult>,
}

impl PublishOutcome {
    /// A caller treats `success_count >= 1` as published (§4.E).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success_count >= 1
    }
}

/// Publishes events to a set of relays, each over its own fresh session.
pub struct Publisher {
    transport: Arc<dyn RelayTransport>,
    timeout_ms: u64,
}

impl Publisher {
    /// Builds a publisher over real WebSocket connections with the default
    /// per-relay timeout.
    #[must_use]
    pub fn new() -> Self {
        Self { transport: Arc::new(WebSocketTransport), timeout_ms: DEFAULT_TIMEOUT_MS }
    }

    /// Builds a publisher over a caller-supplied transport (for tests).
    #[must_use]
    pub fn with_transport(transport: Arc<dyn RelayTransport>, timeout_ms: u64) -> Self {
        Self { transport, timeout_ms }
    }

    /// Publishes `event` to every relay in `relays`, in parallel, each over
    /// its own session (no pooling shared with the subscriber).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if any relay URL is not a valid
    /// `wss://` URL. Per-relay connect/send/timeout failures are NOT
    /// returned as `Err` — they appear as `ok: false` entries in the
    /// returned [`PublishOutcome`].
    pub async fn publish(&self, relays: &[String], event: &Event) -> Result<PublishOutcome> {
        relay::validate_relay_urls(relays)?;

        let results =
            futures_util::future::join_all(relays.iter().map(|r| self.publish_one(r, event))).await;

        let success_count = results.iter().filter(|r| r.ok).count();
        let failure_count = results.len() - success_count;
        Ok(PublishOutcome { total: results.len(), success_count, failure_count, per_relay: results })
    }

    async fn publish_one(&self, relay_url: &str, event: &Event) -> RelayPublishResult {
        let outcome = self.publish_one_inner(relay_url, event).await;
        match outcome {
            Ok(()) => RelayPublishResult { relay: relay_url.to_string(), ok: true, err: None },
            Err(reason) => RelayPublishResult { relay: relay_url.to_string(), ok: false, err: Some(reason) },
        }
    }

    async fn publish_one_inner(&self, relay_url: &str, event: &Event) -> std::result::Result<(), String> {
        let mut session = self.transport.open(relay_url).await.map_err(|e| e.to_string())?;
        let frame = ClientMessage::Event(event.clone()).to_text().map_err(|e| e.to_string())?;
        session.send_text(frame).await.map_err(|e| e.to_string())?;

        let wait = async {
            loop {
                match session.recv().await {
                    Some(Ok(text)) => match relay::parse_relay_message(&text) {
                        Ok(RelayMessage::Ok { event_id, accepted, message }) if event_id == event.id => {
                            return if accepted { Ok(()) } else { Err(message) };
                        }
                        Ok(RelayMessage::Notice { message }) => {
                            debug!(relay = relay_url, %message, "relay NOTICE during publish");
                        }
                        Ok(_) => {} // unrelated message; keep waiting
                        Err(e) => warn!(relay = relay_url, error = %e, "unparseable relay frame"),
                    },
                    Some(Err(e)) => return Err(e.to_string()),
                    None => return Err("closed before OK".to_string()),
                }
            }
        };

        match tokio::time::timeout(Duration::from_millis(self.timeout_ms), wait).await {
            Ok(result) => result,
            Err(_) => Err("timed out waiting for OK".to_string()),
        }
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}
