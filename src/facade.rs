//! Facade (component I): ties the rumor schemas, envelope, publisher,
//! subscriber and waiter registry together behind one
//! `request_response(rumor_partial, recipient_pk, timeout_ms) -> Rumor`
//! call, mirroring the teacher's `CircleManager` facade in
//! `src/circle/manager.rs` (which likewise composes an `MdkManager` and a
//! `CircleStorage` behind one struct). Unlike the teacher's `src/api.rs`
//! (`HavenCore`, an FFI-opaque `flutter_rust_bridge` wrapper), `MessagingCore`
//! is a plain Rust API — there is no FFI surface here.

use std::sync::Arc;

use crate::config::Config;
use crate::crypto::Keypair;
use crate::envelope::{self, RumorPartial};
use crate::error::{CoreError, Result};
use crate::publisher::Publisher;
use crate::subscriber::{Subscriber, SubscriberParams};
use crate::waiter::{DurableWaiterRegistry, InMemoryDurableStore, MemoryWaiterRegistry, WaiterRegistry};

/// Composes a publisher, a running subscriber, and a waiter registry into
/// the one call a caller actually wants: publish a request, get back the
/// matching response (or a timeout/publish failure).
///
/// The registry is held behind the shared [`WaiterRegistry`] trait so the
/// facade can be backed by either of the two implementations (§9 "two
/// registries, one contract... select at start-up by whether a durable
/// table is configured"): [`new`](Self::new)/[`with_transport`](Self::with_transport)
/// pick the in-memory one directly, while [`from_config`](Self::from_config)
/// selects between them based on `Config::durable_store_table`.
pub struct MessagingCore {
    identity: Arc<Keypair>,
    relays: Vec<String>,
    publisher: Publisher,
    subscriber: Subscriber,
    registry: Arc<dyn WaiterRegistry>,
}

impl MessagingCore {
    /// Builds a `MessagingCore` over real WebSocket relay connections and
    /// starts its subscriber immediately (§4.F/§4.I: a running subscriber
    /// routes incoming rumors to the registry via `on_rumor = registry.deliver`).
    #[must_use]
    pub fn new(identity: Keypair, relays: Vec<String>) -> Self {
        let identity = Arc::new(identity);
        let memory_registry = Arc::new(MemoryWaiterRegistry::new());

        let on_rumor = {
            let memory_registry = memory_registry.clone();
            Arc::new(move |rumor, _wrap_event| {
                memory_registry.deliver(&rumor);
            })
        };
        let params = SubscriberParams::new(relays.clone(), identity.clone(), on_rumor);
        let subscriber = Subscriber::new(params);
        subscriber.start();

        Self { identity, relays, publisher: Publisher::new(), subscriber, registry: memory_registry }
    }

    /// Builds a `MessagingCore` over a caller-supplied relay transport (for
    /// tests), sharing one transport between the publisher and subscriber.
    #[must_use]
    pub fn with_transport(
        identity: Keypair,
        relays: Vec<String>,
        transport: Arc<dyn crate::relay::RelayTransport>,
    ) -> Self {
        let identity = Arc::new(identity);
        let memory_registry = Arc::new(MemoryWaiterRegistry::new());

        let on_rumor = {
            let memory_registry = memory_registry.clone();
            Arc::new(move |rumor, _wrap_event| {
                memory_registry.deliver(&rumor);
            })
        };
        let params = SubscriberParams::new(relays.clone(), identity.clone(), on_rumor);
        let subscriber = Subscriber::with_transport(params, transport.clone());
        subscriber.start();

        let publisher = Publisher::with_transport(transport, crate::publisher::DEFAULT_TIMEOUT_MS);
        Self { identity, relays, publisher, subscriber, registry: memory_registry }
    }

    /// Builds a `MessagingCore` from a validated [`Config`], selecting the
    /// waiter registry by whether a durable store table is configured
    /// (§9 "select at start-up by whether a durable table is configured").
    /// With no table configured this is equivalent to [`new`](Self::new);
    /// with one configured, responses are correlated through a
    /// [`DurableWaiterRegistry`] instead — its rows are written here and
    /// read back by polling, but (per §4.H) updated by a writer outside
    /// this process, so the subscriber's own deliveries are not consulted
    /// for correlation in that mode.
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        if config.durable_store_table.is_some() {
            Self::with_durable_registry(
                config.identity,
                config.relays,
                DurableWaiterRegistry::new(InMemoryDurableStore::new()),
            )
        } else {
            Self::new(config.identity, config.relays)
        }
    }

    /// Builds a `MessagingCore` backed by a durable, poll-based waiter
    /// registry instead of the in-memory one. The subscriber still runs
    /// (relays may carry other traffic) but its deliveries are not wired
    /// to the registry, since durable rows are updated by a writer outside
    /// this process (§4.H "the facade only reads").
    #[must_use]
    pub fn with_durable_registry<S>(identity: Keypair, relays: Vec<String>, registry: DurableWaiterRegistry<S>) -> Self
    where
        S: crate::waiter::DurableStore + 'static,
    {
        let identity = Arc::new(identity);
        let registry: Arc<dyn WaiterRegistry> = Arc::new(registry);

        let on_rumor = Arc::new(move |_rumor, _wrap_event| {
            tracing::debug!(
                "rumor delivered to subscriber under durable correlation; ignored, \
                 durable rows are updated by an out-of-process writer"
            );
        });
        let params = SubscriberParams::new(relays.clone(), identity.clone(), on_rumor);
        let subscriber = Subscriber::new(params);
        subscriber.start();

        Self { identity, relays, publisher: Publisher::new(), subscriber, registry }
    }

    /// Builds a `MessagingCore` over a caller-supplied transport and a
    /// caller-supplied durable registry (for tests): this lets a test keep
    /// its own handle on the backing store to simulate a writer outside
    /// this process updating a row while this instance polls it.
    #[must_use]
    pub fn with_transport_and_durable_registry<S>(
        identity: Keypair,
        relays: Vec<String>,
        transport: Arc<dyn crate::relay::RelayTransport>,
        registry: DurableWaiterRegistry<S>,
    ) -> Self
    where
        S: crate::waiter::DurableStore + 'static,
    {
        let identity = Arc::new(identity);
        let registry: Arc<dyn WaiterRegistry> = Arc::new(registry);

        let on_rumor = Arc::new(move |_rumor, _wrap_event| {
            tracing::debug!(
                "rumor delivered to subscriber under durable correlation; ignored, \
                 durable rows are updated by an out-of-process writer"
            );
        });
        let params = SubscriberParams::new(relays.clone(), identity.clone(), on_rumor);
        let subscriber = Subscriber::with_transport(params, transport.clone());
        subscriber.start();

        let publisher = Publisher::with_transport(transport, crate::publisher::DEFAULT_TIMEOUT_MS);
        Self { identity, relays, publisher, subscriber, registry }
    }

    /// This instance's public identity, hex-encoded.
    #[must_use]
    pub fn pubkey_hex(&self) -> String {
        self.identity.pubkey_hex()
    }

    /// The subscription id this instance's subscriber sends in every
    /// `REQ`/`CLOSE` frame. Exposed for tests that must address relay
    /// `EVENT` frames at a specific subscriber.
    #[must_use]
    pub fn subscriber_subid(&self) -> &str {
        self.subscriber.subid()
    }

    /// Stops the underlying subscriber and cancels every outstanding waiter
    /// (§5 "`cancel_all()` is called on process shutdown").
    pub async fn shutdown(&self) {
        self.subscriber.stop().await;
        self.registry.cancel_all().await;
    }

    /// Builds, publishes, and awaits the response to a request rumor (§4.I).
    ///
    /// 1. Builds the rumor from `rumor_partial`, computing its id.
    /// 2. Registers a waiter for that id *before* publishing — awaited
    ///    synchronously, so a reply that arrives unusually fast cannot
    ///    race ahead of the registration.
    /// 3. Seals and wraps the rumor for `recipient_pk`.
    /// 4. Publishes the wrap to every configured relay; if zero relays
    ///    accept it, cancels the waiter and fails with `PublishFailed`.
    /// 5. Awaits the waiter, returning the response rumor.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PublishFailed`] if no relay accepted the
    /// event, [`CoreError::Timeout`] if no response arrives within
    /// `timeout_ms`, or a crypto/envelope error if sealing/wrapping fails.
    pub async fn request_response(
        &self,
        rumor_partial: RumorPartial,
        recipient_pk: &str,
        timeout_ms: u64,
    ) -> Result<crate::envelope::Rumor> {
        let rumor = envelope::make_rumor(rumor_partial, &self.identity);

        let request_data = serde_json::to_string(&rumor).map_err(|e| CoreError::BuildInvalid(e.to_string()))?;
        self.registry.register(&rumor.id, &request_data).await?;

        let sealed = envelope::seal(&rumor, &self.identity, recipient_pk)?;
        let wrapped = envelope::wrap(&sealed, recipient_pk)?;

        let outcome = self.publisher.publish(&self.relays, &wrapped).await.map_err(|e| {
            CoreError::RelayProtocolError(e.to_string())
        })?;

        if outcome.success_count == 0 {
            self.registry.cancel(&rumor.id).await;
            return Err(CoreError::PublishFailed { attempted: outcome.total });
        }

        Ok(self.registry.wait(rumor.id.clone(), timeout_ms).await?)
    }

    /// Seals, wraps, and publishes `rumor_partial` to `recipient_pk` without
    /// registering a waiter — the one-way send a responder uses to answer a
    /// request it already decrypted (the response side of §4.I's `request_response`
    /// exchange needs no correlation of its own).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PublishFailed`] if no relay accepted the event,
    /// or a crypto/envelope error if sealing/wrapping fails.
    pub async fn send(&self, rumor_partial: RumorPartial, recipient_pk: &str) -> Result<()> {
        let rumor = envelope::make_rumor(rumor_partial, &self.identity);
        let sealed = envelope::seal(&rumor, &self.identity, recipient_pk)?;
        let wrapped = envelope::wrap(&sealed, recipient_pk)?;

        let outcome = self
            .publisher
            .publish(&self.relays, &wrapped)
            .await
            .map_err(|e| CoreError::RelayProtocolError(e.to_string()))?;

        if outcome.success_count == 0 {
            return Err(CoreError::PublishFailed { attempted: outcome.total });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::FakeTransport;
    use crate::rumor::{build_response, ReservationResponseParams, Status};

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn publish_failed_when_no_relay_accepts() {
        let transport = Arc::new(FakeTransport::new());
        let identity = Keypair::generate();
        let core = MessagingCore::with_transport(
            identity,
            vec!["wss://relay-a".to_string()],
            transport.clone(),
        );
        settle().await;

        let recipient = Keypair::generate();
        let task = tokio::spawn(async move {
            core.request_response(RumorPartial::new(9901).with_content("hi"), &recipient.pubkey_hex(), 200)
                .await
        });
        settle().await;
        transport.handle_for("wss://relay-a").unwrap().disconnect("refused");

        let result = task.await.unwrap();
        assert!(matches!(result, Err(CoreError::PublishFailed { .. })));
    }

    #[tokio::test]
    async fn timeout_when_no_response_arrives() {
        let transport = Arc::new(FakeTransport::new());
        let identity = Keypair::generate();
        let core = MessagingCore::with_transport(
            identity,
            vec!["wss://relay-a".to_string()],
            transport.clone(),
        );
        settle().await;

        let recipient = Keypair::generate().pubkey_hex();
        let task = tokio::spawn(async move {
            core.request_response(RumorPartial::new(9901).with_content("hi"), &recipient, 50).await
        });
        settle().await;
        let handle = transport.handle_for("wss://relay-a").unwrap();
        let sent = handle.sent_frames();
        let publish_frame = sent.iter().find(|f| f.starts_with(r#"["EVENT""#)).unwrap();
        let request_id = extract_request_id(publish_frame);
        handle.push_frame(format!(r#"["OK","{request_id}",true,""]"#));

        let result = task.await.unwrap();
        assert!(matches!(result, Err(CoreError::Timeout(50))));
    }

    #[tokio::test]
    async fn response_delivered_through_subscriber_resolves_request() {
        let transport = Arc::new(FakeTransport::new());
        let requester = Keypair::generate();
        let requester_pk = requester.pubkey_hex();
        let responder = Keypair::generate();

        let core = MessagingCore::with_transport(
            requester,
            vec!["wss://relay-a".to_string()],
            transport.clone(),
        );
        settle().await;

        let recipient_pk = responder.pubkey_hex();
        let task = tokio::spawn(async move {
            core.request_response(RumorPartial::new(9901).with_content("hi"), &recipient_pk, 2000).await
        });
        settle().await;

        // Acknowledge the publish so the facade doesn't fail with PublishFailed.
        let handle = transport.handle_for("wss://relay-a").unwrap();
        let sent = handle.sent_frames();
        let publish_frame = sent.iter().find(|f| f.starts_with(r#"["EVENT""#)).unwrap();
        let request_id = extract_request_id(publish_frame);
        handle.push_frame(format!(r#"["OK","{request_id}",true,""]"#));
        settle().await;

        // Build and deliver a matching response rumor addressed to the requester.
        let response = build_response(ReservationResponseParams {
            requester_pk: requester_pk.clone(),
            request_rumor_id: request_id,
            status: Status::Confirmed,
            time: 1_785_704_400,
            tzid: "America/New_York".to_string(),
            duration: 90,
            content: String::new(),
        })
        .unwrap();
        let response_rumor = envelope::make_rumor(response, &responder);
        let sealed = envelope::seal(&response_rumor, &responder, &requester_pk).unwrap();
        let wrapped = envelope::wrap(&sealed, &requester_pk).unwrap();

        let subid = handle
            .sent_frames()
            .iter()
            .find_map(|f| {
                let value: serde_json::Value = serde_json::from_str(f).ok()?;
                if value.get(0)?.as_str()? == "REQ" {
                    Some(value.get(1)?.as_str()?.to_string())
                } else {
                    None
                }
            })
            .unwrap();
        let frame =
            format!(r#"["EVENT","{subid}",{}]"#, serde_json::to_string(&wrapped).unwrap());
        handle.push_frame(frame);

        let rumor = task.await.unwrap().unwrap();
        assert_eq!(rumor.id, response_rumor.id);
    }

    fn extract_request_id(event_frame: &str) -> String {
        let value: serde_json::Value = serde_json::from_str(event_frame).unwrap();
        value[1]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn from_config_builds_and_shuts_down_with_durable_table_configured() {
        let config = Config::new(
            &"1".repeat(64),
            vec!["wss://relay.example.com".to_string()],
            5000,
            Some("reservations".to_string()),
            None,
        )
        .unwrap();
        let core = MessagingCore::from_config(config);
        core.shutdown().await;
    }

    #[tokio::test]
    async fn from_config_builds_and_shuts_down_with_no_durable_table() {
        let config =
            Config::new(&"1".repeat(64), vec!["wss://relay.example.com".to_string()], 5000, None, None).unwrap();
        let core = MessagingCore::from_config(config);
        core.shutdown().await;
    }

    #[tokio::test]
    async fn durable_registry_resolves_request_response_via_out_of_band_update() {
        let transport = Arc::new(FakeTransport::new());
        let requester = Keypair::generate();
        let requester_pk = requester.pubkey_hex();
        let responder = Keypair::generate();

        // Two registries share one store: `core_registry` is the one the
        // facade polls, `external_registry` stands in for a writer outside
        // this process updating the same row (§4.H "facade only reads").
        let store = Arc::new(InMemoryDurableStore::new());
        let core_registry = DurableWaiterRegistry::new(store.clone()).with_poll_ms(10);
        let external_registry = DurableWaiterRegistry::new(store).with_poll_ms(10);

        let core = MessagingCore::with_transport_and_durable_registry(
            requester,
            vec!["wss://relay-a".to_string()],
            transport.clone(),
            core_registry,
        );
        settle().await;

        let recipient_pk = responder.pubkey_hex();
        let task = tokio::spawn(async move {
            core.request_response(RumorPartial::new(9901).with_content("hi"), &recipient_pk, 2000).await
        });
        settle().await;

        let handle = transport.handle_for("wss://relay-a").unwrap();
        let sent = handle.sent_frames();
        let publish_frame = sent.iter().find(|f| f.starts_with(r#"["EVENT""#)).unwrap();
        let request_id = extract_request_id(publish_frame);
        handle.push_frame(format!(r#"["OK","{request_id}",true,""]"#));

        let response = build_response(ReservationResponseParams {
            requester_pk,
            request_rumor_id: request_id.clone(),
            status: Status::Confirmed,
            time: 1_785_704_400,
            tzid: "America/New_York".to_string(),
            duration: 90,
            content: String::new(),
        })
        .unwrap();
        let response_rumor = envelope::make_rumor(response, &responder);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        external_registry.update_with_response(&request_id, &response_rumor).await.unwrap();

        let rumor = task.await.unwrap().unwrap();
        assert_eq!(rumor.id, response_rumor.id);
    }
}
