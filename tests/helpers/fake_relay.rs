//! A shared in-memory relay used by the end-to-end scenarios: two
//! `MessagingCore` instances talk to the same `FakeTransport`/URL, so a
//! publish from one is visible to the other's subscriber without any real
//! network I/O.
//!
//! `FakeTransport` itself (`src/relay/connection.rs`) is a per-connection
//! double, not a routing relay — pushing a frame into one session's handle
//! never reaches another session opened against the same URL. These helpers
//! do the forwarding a real relay would do: read the `EVENT` frame a
//! publish session sent and re-inject it as an inbound `EVENT` on the
//! handle of the session the target's subscriber actually opened.

use std::sync::Arc;

use envoy_core::relay::{FakeRelayHandle, FakeTransport};
use envoy_core::MessagingCore;

pub const RELAY_URL: &str = "wss://fake-relay.test";

/// Builds a `MessagingCore` wired to `transport`, so multiple cores can
/// share one fake relay the way independent processes share a real one.
pub fn core_on_shared_relay(
    identity: envoy_core::crypto::Keypair,
    transport: Arc<FakeTransport>,
) -> MessagingCore {
    MessagingCore::with_transport(identity, vec![RELAY_URL.to_string()], transport)
}

/// Polls pending futures until they stall, giving spawned subscriber/publish
/// tasks a chance to run before a test injects or inspects relay traffic.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Acks the most recent `EVENT` frame `publish_handle` sent with an `OK`,
/// returning the acked event's id.
pub fn ack_latest_publish(publish_handle: &FakeRelayHandle) -> String {
    let event_id = latest_published_event_id(publish_handle);
    publish_handle.push_frame(format!(r#"["OK","{event_id}",true,""]"#));
    event_id
}

/// Returns the id of the most recent event `handle` sent as an `EVENT` frame.
pub fn latest_published_event_id(handle: &FakeRelayHandle) -> String {
    let sent = handle.sent_frames();
    let frame = sent.iter().rev().find(|f| f.starts_with(r#"["EVENT""#)).expect("no EVENT frame sent");
    let value: serde_json::Value = serde_json::from_str(frame).unwrap();
    value[1]["id"].as_str().unwrap().to_string()
}

/// Forwards the most recent event `publish_handle` sent to `target_handle`
/// as an inbound `EVENT` frame for `target_subid`, simulating a relay
/// routing a publish to a matching subscription. Returns the forwarded
/// event's id.
pub fn forward_latest_publish(
    publish_handle: &FakeRelayHandle,
    target_handle: &FakeRelayHandle,
    target_subid: &str,
) -> String {
    let sent = publish_handle.sent_frames();
    let frame = sent.iter().rev().find(|f| f.starts_with(r#"["EVENT""#)).expect("no EVENT frame sent");
    let value: serde_json::Value = serde_json::from_str(frame).unwrap();
    let event_value = value[1].clone();
    let event_id = event_value["id"].as_str().unwrap().to_string();
    let relay_frame = serde_json::json!(["EVENT", target_subid, event_value]).to_string();
    target_handle.push_frame(relay_frame);
    event_id
}
