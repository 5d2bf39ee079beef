//! Multi-relay subscriber (component F): maintains a persistent
//! subscription for gift wraps addressed to a recipient, across relay
//! reconnects.

mod error;

pub use error::Error;

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::crypto::{Keypair, MAX_JITTER_SECS};
use crate::envelope::{self, Event, Rumor, KIND_GIFT_WRAP};
use crate::relay::{self, ClientMessage, DisconnectCause, RelayMessage, RelayTransport, WebSocketTransport};

/// Default delay before reopening a session after an involuntary disconnect.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5000;

type RumorCallback = dyn Fn(Rumor, Event) + Send + Sync;
type ErrorCallback = dyn Fn(Error, String) + Send + Sync;

/// Caller-supplied configuration for a [`Subscriber`].
pub struct SubscriberParams {
    pub relays: Vec<String>,
    pub recipient_sk: Arc<Keypair>,
    pub on_rumor: Arc<RumorCallback>,
    pub on_error: Option<Arc<ErrorCallback>>,
    pub reconnect_delay_ms: u64,
}

impl SubscriberParams {
    /// Builds params with the default reconnect delay and no error callback.
    #[must_use]
    pub fn new(relays: Vec<String>, recipient_sk: Arc<Keypair>, on_rumor: Arc<RumorCallback>) -> Self {
        Self { relays, recipient_sk, on_rumor, on_error: None, reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS }
    }

    #[must_use]
    pub fn with_on_error(mut self, on_error: Arc<ErrorCallback>) -> Self {
        self.on_error = Some(on_error);
        self
    }

    #[must_use]
    pub const fn with_reconnect_delay_ms(mut self, ms: u64) -> Self {
        self.reconnect_delay_ms = ms;
        self
    }
}

fn new_subid() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// A persistent, multi-relay gift-wrap subscription.
pub struct Subscriber {
    relays: Vec<String>,
    subid: String,
    recipient_sk: Arc<Keypair>,
    recipient_pk: String,
    original_since: i64,
    last_event_at: Arc<AtomicI64>,
    reconnect_delay_ms: u64,
    transport: Arc<dyn RelayTransport>,
    on_rumor: Arc<RumorCallback>,
    on_error: Option<Arc<ErrorCallback>>,
    running: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    stop_notify: Arc<Notify>,
    handles: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Subscriber {
    /// Builds a subscriber over real WebSocket connections.
    #[must_use]
    pub fn new(params: SubscriberParams) -> Self {
        Self::with_transport(params, Arc::new(WebSocketTransport))
    }

    /// Builds a subscriber over a caller-supplied transport (for tests).
    #[must_use]
    pub fn with_transport(params: SubscriberParams, transport: Arc<dyn RelayTransport>) -> Self {
        let recipient_pk = params.recipient_sk.pubkey_hex();
        Self {
            relays: params.relays,
            subid: new_subid(),
            recipient_sk: params.recipient_sk,
            recipient_pk,
            original_since: crate::crypto::unix_now() - MAX_JITTER_SECS,
            last_event_at: Arc::new(AtomicI64::new(i64::MIN)),
            reconnect_delay_ms: params.reconnect_delay_ms,
            transport,
            on_rumor: params.on_rumor,
            on_error: params.on_error,
            running: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(true)),
            stop_notify: Arc::new(Notify::new()),
            handles: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// The stable subscription id used in every `REQ`/`CLOSE` frame this
    /// instance sends.
    #[must_use]
    pub fn subid(&self) -> &str {
        &self.subid
    }

    /// Starts one session per relay. Idempotent: a second call while
    /// already running is a no-op.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stopped.store(false, Ordering::SeqCst);

        let mut handles = self.handles.lock().unwrap();
        for relay_url in self.relays.clone() {
            let handle = tokio::spawn(run_relay_loop(RelayLoopContext {
                relay_url,
                subid: self.subid.clone(),
                recipient_pk: self.recipient_pk.clone(),
                recipient_sk: self.recipient_sk.clone(),
                original_since: self.original_since,
                last_event_at: self.last_event_at.clone(),
                transport: self.transport.clone(),
                reconnect_delay_ms: self.reconnect_delay_ms,
                stopped: self.stopped.clone(),
                stop_notify: self.stop_notify.clone(),
                on_rumor: self.on_rumor.clone(),
                on_error: self.on_error.clone(),
            }));
            handles.push(handle);
        }
    }

    /// Closes every session and stops reconnecting. Idempotent.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.stopped.store(true, Ordering::SeqCst);
        self.stop_notify.notify_waiters();

        let handles: Vec<_> = self.handles.lock().unwrap().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }
}

struct RelayLoopContext {
    relay_url: String,
    subid: String,
    recipient_pk: String,
    recipient_sk: Arc<Keypair>,
    original_since: i64,
    last_event_at: Arc<AtomicI64>,
    transport: Arc<dyn RelayTransport>,
    reconnect_delay_ms: u64,
    stopped: Arc<AtomicBool>,
    stop_notify: Arc<Notify>,
    on_rumor: Arc<RumorCallback>,
    on_error: Option<Arc<ErrorCallback>>,
}

fn current_since(ctx: &RelayLoopContext) -> i64 {
    let last = ctx.last_event_at.load(Ordering::SeqCst);
    if last == i64::MIN {
        ctx.original_since
    } else {
        ctx.original_since.max(last - 1)
    }
}

fn report_error(ctx: &RelayLoopContext, err: Error) {
    if let Some(cb) = &ctx.on_error {
        cb(err, ctx.relay_url.clone());
    }
}

async fn run_relay_loop(ctx: RelayLoopContext) {
    loop {
        if ctx.stopped.load(Ordering::SeqCst) {
            return;
        }

        let mut session = match ctx.transport.open(&ctx.relay_url).await {
            Ok(s) => s,
            Err(e) => {
                report_error(&ctx, e.into());
                if wait_or_stop(&ctx).await {
                    return;
                }
                continue;
            }
        };

        let filter = serde_json::json!({
            "kinds": [KIND_GIFT_WRAP],
            "#p": [ctx.recipient_pk],
            "since": current_since(&ctx),
        });
        let req = ClientMessage::Req { subid: ctx.subid.clone(), filter };
        let Ok(req_text) = req.to_text() else {
            warn!(relay = %ctx.relay_url, "failed to serialize REQ frame");
            return;
        };
        if let Err(e) = session.send_text(req_text).await {
            report_error(&ctx, e.into());
            if wait_or_stop(&ctx).await {
                return;
            }
            continue;
        }

        drive_session(&ctx, session.as_mut()).await;
        if ctx.stopped.load(Ordering::SeqCst) {
            return;
        }
        if wait_or_stop(&ctx).await {
            return;
        }
    }
}

/// Drives one open session until it disconnects or `stop()` is called.
/// Returns `true` if the disconnect was involuntary.
async fn drive_session(ctx: &RelayLoopContext, session: &mut dyn relay::RelaySession) -> bool {
    loop {
        tokio::select! {
            () = ctx.stop_notify.notified() => {
                let close = ClientMessage::Close { subid: ctx.subid.clone() };
                if let Ok(text) = close.to_text() {
                    let _ = session.send_text(text).await;
                }
                session.close().await;
                return false;
            }
            frame = session.recv() => {
                match frame {
                    Some(Ok(text)) => handle_frame(ctx, &text),
                    Some(Err(e)) => {
                        report_error(ctx, e.into());
                        return true;
                    }
                    None => {
                        return !matches!(session.disconnect_cause(), Some(DisconnectCause::Intentional));
                    }
                }
            }
        }
    }
}

fn handle_frame(ctx: &RelayLoopContext, text: &str) {
    match relay::parse_relay_message(text) {
        Ok(RelayMessage::Event { subid, event }) if subid == ctx.subid => {
            if event.kind != KIND_GIFT_WRAP {
                return;
            }
            match envelope::open(&event, &ctx.recipient_sk) {
                Ok(rumor) => {
                    bump_last_event_at(ctx, event.created_at);
                    (ctx.on_rumor)(rumor, event);
                }
                Err(e) => report_error(ctx, e.into()),
            }
        }
        Ok(RelayMessage::Event { .. } | RelayMessage::Eose { .. } | RelayMessage::Notice { .. } | RelayMessage::Closed { .. }) => {
            debug!(relay = %ctx.relay_url, "informational relay message");
        }
        Err(e) => report_error(ctx, e.into()),
    }
}

fn bump_last_event_at(ctx: &RelayLoopContext, created_at: i64) {
    ctx.last_event_at.fetch_max(created_at, Ordering::SeqCst);
}

/// Sleeps `reconnect_delay_ms`, waking early if `stop()` is called.
/// Returns `true` if the caller should stop retrying.
async fn wait_or_stop(ctx: &RelayLoopContext) -> bool {
    tokio::select! {
        () = ctx.stop_notify.notified() => true,
        () = tokio::time::sleep(Duration::from_millis(ctx.reconnect_delay_ms)) => ctx.stopped.load(Ordering::SeqCst),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{seal, wrap, RumorPartial};
    use crate::relay::FakeTransport;
    use std::sync::Mutex as StdMutex;

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    fn build(recipient: Arc<Keypair>, transport: FakeTransport, relays: Vec<String>) -> (Subscriber, Arc<StdMutex<Vec<Rumor>>>) {
        let received = Arc::new(StdMutex::new(Vec::new()));
        let received_clone = received.clone();
        let params = SubscriberParams::new(
            relays,
            recipient,
            Arc::new(move |rumor, _wrap| received_clone.lock().unwrap().push(rumor)),
        )
        .with_reconnect_delay_ms(20);
        (Subscriber::with_transport(params, Arc::new(transport)), received)
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let recipient = Arc::new(Keypair::generate());
        let transport = FakeTransport::new();
        let (sub, _received) = build(recipient, transport.clone(), vec!["wss://relay-a".to_string()]);
        sub.start();
        sub.start();
        settle().await;
        // Only one REQ should have gone out despite two start() calls.
        let handle = transport.handle_for("wss://relay-a").unwrap();
        let req_count = handle.sent_frames().iter().filter(|f| f.starts_with(r#"["REQ""#)).count();
        assert_eq!(req_count, 1);
        sub.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let recipient = Arc::new(Keypair::generate());
        let transport = FakeTransport::new();
        let (sub, _received) = build(recipient, transport, vec!["wss://relay-a".to_string()]);
        sub.start();
        settle().await;
        sub.stop().await;
        sub.stop().await; // must not hang or panic
    }

    #[tokio::test]
    async fn delivers_rumor_for_matching_gift_wrap() {
        let author = Keypair::generate();
        let recipient = Arc::new(Keypair::generate());
        let transport = FakeTransport::new();
        let (sub, received) = build(recipient.clone(), transport.clone(), vec!["wss://relay-a".to_string()]);
        sub.start();
        settle().await;

        let rumor = envelope::make_rumor(RumorPartial::new(9901).with_content("hi"), &author);
        let sealed = seal::seal(&rumor, &author, &recipient.pubkey_hex()).unwrap();
        let wrapped = wrap::wrap(&sealed, &recipient.pubkey_hex()).unwrap();

        let handle = transport.handle_for("wss://relay-a").unwrap();
        let frame =
            format!(r#"["EVENT","{}",{}]"#, sub.subid(), serde_json::to_string(&wrapped).unwrap());
        handle.push_frame(frame);
        settle().await;

        assert_eq!(received.lock().unwrap().len(), 1);
        assert_eq!(received.lock().unwrap()[0].id, rumor.id);
        sub.stop().await;
    }

    #[tokio::test]
    async fn ignores_non_gift_wrap_events() {
        let recipient = Arc::new(Keypair::generate());
        let transport = FakeTransport::new();
        let (sub, received) = build(recipient, transport.clone(), vec!["wss://relay-a".to_string()]);
        sub.start();
        settle().await;

        let handle = transport.handle_for("wss://relay-a").unwrap();
        let other = Event {
            id: "x".repeat(64),
            pubkey: "y".repeat(64),
            created_at: 0,
            kind: 1,
            tags: vec![],
            content: String::new(),
            sig: "z".repeat(128),
        };
        let frame = format!(r#"["EVENT","{}",{}]"#, sub.subid(), serde_json::to_string(&other).unwrap());
        handle.push_frame(frame);
        settle().await;

        assert!(received.lock().unwrap().is_empty());
        sub.stop().await;
    }

    #[tokio::test]
    async fn reconnects_after_involuntary_disconnect() {
        let recipient = Arc::new(Keypair::generate());
        let transport = FakeTransport::new();
        let (sub, _received) = build(recipient, transport.clone(), vec!["wss://relay-a".to_string()]);
        sub.start();
        settle().await;
        transport.handle_for("wss://relay-a").unwrap().disconnect("reset");
        // Past the 20ms reconnect delay, a new REQ should go out.
        tokio::time::sleep(Duration::from_millis(60)).await;
        settle().await;

        let handle = transport.handle_for("wss://relay-a").unwrap();
        let req_count = handle.sent_frames().iter().filter(|f| f.starts_with(r#"["REQ""#)).count();
        assert!(req_count >= 1);
        sub.stop().await;
    }
}
