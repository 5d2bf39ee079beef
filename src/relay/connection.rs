//! Single-relay WebSocket session (§4.D).
//!
//! A session exposes `open`/`send_text`/`close` and an inbound stream of
//! text frames. It never reconnects — that policy belongs to
//! [`crate::subscriber`]. [`RelayTransport`]/[`RelaySession`] are trait
//! objects so higher layers can be tested against an in-memory fake
//! instead of a live socket (§9: "test doubles replace them by
//! construction").

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use super::error::{Error, Result};
use super::types::{validate_relay_urls, DisconnectCause};

/// A single open connection to one relay.
#[async_trait]
pub trait RelaySession: Send {
    /// Sends a text frame. Fails if the session is closed.
    async fn send_text(&mut self, frame: String) -> Result<()>;

    /// Waits for the next inbound text frame. Returns `None` once the
    /// session has closed (intentionally or otherwise); check
    /// [`disconnect_cause`](Self::disconnect_cause) to distinguish the two.
    async fn recv(&mut self) -> Option<Result<String>>;

    /// Closes the session. Marks the eventual `recv() == None` as
    /// [`DisconnectCause::Intentional`].
    async fn close(&mut self);

    /// Set once the session has ended; `None` while still open.
    fn disconnect_cause(&self) -> Option<DisconnectCause>;
}

/// Opens sessions against relay URLs.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Opens a new session to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `url` is not `wss://`, or
    /// [`Error::ConnectFailed`] if the handshake fails.
    async fn open(&self, url: &str) -> Result<Box<dyn RelaySession>>;
}

/// [`RelayTransport`] backed by real `wss://` WebSocket connections.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketTransport;

#[async_trait]
impl RelayTransport for WebSocketTransport {
    async fn open(&self, url: &str) -> Result<Box<dyn RelaySession>> {
        validate_relay_urls(std::slice::from_ref(&url.to_string()))?;
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| Error::ConnectFailed { url: url.to_string(), reason: e.to_string() })?;
        Ok(Box::new(WebSocketSession { stream, intentional_close: false, cause: None }))
    }
}

struct WebSocketSession {
    stream: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    intentional_close: bool,
    cause: Option<DisconnectCause>,
}

#[async_trait]
impl RelaySession for WebSocketSession {
    async fn send_text(&mut self, frame: String) -> Result<()> {
        if self.cause.is_some() {
            return Err(Error::Closed);
        }
        self.stream.send(Message::Text(frame.into())).await.map_err(|e| Error::SendFailed(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text.to_string())),
                Some(Ok(Message::Close(_))) | None => {
                    self.cause = Some(if self.intentional_close {
                        DisconnectCause::Intentional
                    } else {
                        DisconnectCause::Involuntary("remote closed the connection".to_string())
                    });
                    return None;
                }
                Some(Ok(_)) => continue, // ping/pong/binary frames carry no wire message
                Some(Err(e)) => {
                    self.cause = Some(DisconnectCause::Involuntary(e.to_string()));
                    return Some(Err(Error::Protocol(e.to_string())));
                }
            }
        }
    }

    async fn close(&mut self) {
        self.intentional_close = true;
        let _ = self.stream.close(None).await;
        self.cause = Some(DisconnectCause::Intentional);
    }

    fn disconnect_cause(&self) -> Option<DisconnectCause> {
        self.cause.clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod fake {
    //! In-memory [`RelayTransport`]/[`RelaySession`] for tests. Frames sent
    //! by the crate are pushed to `sent`; frames queued via
    //! [`FakeRelayHandle::push_frame`] are delivered to `recv`.

    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use tokio::sync::Notify;

    use super::{async_trait, DisconnectCause, Error, RelaySession, RelayTransport, Result};

    #[derive(Default)]
    struct Shared {
        sent: Mutex<Vec<String>>,
        inbox: Mutex<VecDeque<String>>,
        notify: Notify,
        closed: Mutex<Option<DisconnectCause>>,
    }

    /// Handle retained by a test to inspect/drive a [`FakeSession`].
    #[derive(Clone)]
    pub struct FakeRelayHandle {
        shared: Arc<Shared>,
    }

    impl FakeRelayHandle {
        /// Queues a frame the fake session's `recv()` will yield next.
        pub fn push_frame(&self, frame: impl Into<String>) {
            self.shared.inbox.lock().unwrap().push_back(frame.into());
            self.shared.notify.notify_waiters();
        }

        /// Simulates an involuntary disconnect.
        pub fn disconnect(&self, reason: impl Into<String>) {
            *self.shared.closed.lock().unwrap() = Some(DisconnectCause::Involuntary(reason.into()));
            self.shared.notify.notify_waiters();
        }

        /// Returns every frame sent through this session so far.
        #[must_use]
        pub fn sent_frames(&self) -> Vec<String> {
            self.shared.sent.lock().unwrap().clone()
        }
    }

    /// [`RelayTransport`] that hands out [`FakeSession`]s instead of sockets.
    #[derive(Clone, Default)]
    pub struct FakeTransport {
        handles: Arc<Mutex<Vec<(String, FakeRelayHandle)>>>,
    }

    impl FakeTransport {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Returns the handle for the most recently opened session against
        /// `url`, if any (a relay reconnecting opens a new session with the
        /// same URL, so this is the one with an active peer on the other
        /// end).
        #[must_use]
        pub fn handle_for(&self, url: &str) -> Option<FakeRelayHandle> {
            self.handles.lock().unwrap().iter().rev().find(|(u, _)| u == url).map(|(_, h)| h.clone())
        }
    }

    #[async_trait]
    impl RelayTransport for FakeTransport {
        async fn open(&self, url: &str) -> Result<Box<dyn RelaySession>> {
            let shared = Arc::new(Shared::default());
            let handle = FakeRelayHandle { shared: shared.clone() };
            self.handles.lock().unwrap().push((url.to_string(), handle));
            Ok(Box::new(FakeSession { shared, intentional_close: false }))
        }
    }

    struct FakeSession {
        shared: Arc<Shared>,
        intentional_close: bool,
    }

    #[async_trait]
    impl RelaySession for FakeSession {
        async fn send_text(&mut self, frame: String) -> Result<()> {
            if self.shared.closed.lock().unwrap().is_some() {
                return Err(Error::Closed);
            }
            self.shared.sent.lock().unwrap().push(frame);
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String>> {
            loop {
                if let Some(frame) = self.shared.inbox.lock().unwrap().pop_front() {
                    return Some(Ok(frame));
                }
                if let Some(cause) = self.shared.closed.lock().unwrap().clone() {
                    return match cause {
                        DisconnectCause::Intentional => None,
                        DisconnectCause::Involuntary(_) => None,
                    };
                }
                self.shared.notify.notified().await;
            }
        }

        async fn close(&mut self) {
            self.intentional_close = true;
            *self.shared.closed.lock().unwrap() = Some(DisconnectCause::Intentional);
            self.shared.notify.notify_waiters();
        }

        fn disconnect_cause(&self) -> Option<DisconnectCause> {
            self.shared.closed.lock().unwrap().clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeTransport;
    use super::*;

    #[tokio::test]
    async fn fake_session_delivers_queued_frames() {
        let transport = FakeTransport::new();
        let mut session = transport.open("wss://fake").await.unwrap();
        let handle = transport.handle_for("wss://fake").unwrap();
        handle.push_frame(r#"["NOTICE","hi"]"#);
        let frame = session.recv().await.unwrap().unwrap();
        assert_eq!(frame, r#"["NOTICE","hi"]"#);
    }

    #[tokio::test]
    async fn fake_session_records_sent_frames() {
        let transport = FakeTransport::new();
        let mut session = transport.open("wss://fake").await.unwrap();
        session.send_text(r#"["REQ","sub1",{}]"#.to_string()).await.unwrap();
        let handle = transport.handle_for("wss://fake").unwrap();
        assert_eq!(handle.sent_frames(), vec![r#"["REQ","sub1",{}]"#]);
    }

    #[tokio::test]
    async fn close_is_intentional() {
        let transport = FakeTransport::new();
        let mut session = transport.open("wss://fake").await.unwrap();
        session.close().await;
        assert!(session.recv().await.is_none());
        assert_eq!(session.disconnect_cause(), Some(DisconnectCause::Intentional));
    }

    #[tokio::test]
    async fn handle_disconnect_is_involuntary() {
        let transport = FakeTransport::new();
        let mut session = transport.open("wss://fake").await.unwrap();
        let handle = transport.handle_for("wss://fake").unwrap();
        handle.disconnect("socket reset");
        assert!(session.recv().await.is_none());
        assert!(matches!(session.disconnect_cause(), Some(DisconnectCause::Involuntary(_))));
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let transport = FakeTransport::new();
        let mut session = transport.open("wss://fake").await.unwrap();
        session.close().await;
        assert!(session.send_text("x".to_string()).await.is_err());
    }
}
