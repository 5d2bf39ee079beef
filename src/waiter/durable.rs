//! Durable, poll-backed waiter registry (component H): survives process
//! restarts by parking pending correlations in a key-value store instead of
//! an in-process oneshot channel. Shares only the `wait` contract with
//! [`crate::waiter::MemoryWaiterRegistry`] (§9 "two registries, one
//! contract") — there is no in-process channel to `deliver`/`cancel`, so a
//! subscriber's callback instead calls [`DurableWaiterRegistry::update_with_response`]
//! and a caller's `wait` polls the row until it settles.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::envelope::Rumor;

use super::error::{Error, Result};

/// How long a pending row is considered valid before it is treated as
/// expired (five minutes).
pub const PENDING_TTL_SECS: i64 = 300;

/// Default interval between `wait` polls of the store (§4.H).
pub const DEFAULT_POLL_MS: u64 = 2000;

/// Lifecycle state of a durable correlation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowStatus {
    Pending,
    Confirmed,
    Denied,
}

/// One row of the durable correlation table, keyed by request id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurableRow {
    pub status: RowStatus,
    pub request_data: String,
    pub response_data: Option<String>,
    pub response_received_at: Option<i64>,
    pub expires_at: i64,
}

/// Key-value backing store for [`DurableWaiterRegistry`]. No corpus crate
/// speaks DynamoDB, so production deployments implement this trait against
/// whatever table-shaped store they have; [`InMemoryDurableStore`] is the
/// one implementation shipped here.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Fetches the current row for `request_id`, if any.
    async fn get_row(&self, request_id: &str) -> Result<Option<DurableRow>>;

    /// Inserts a brand-new pending row.
    async fn put_pending_row(&self, request_id: &str, row: DurableRow) -> Result<()>;

    /// Overwrites the row for `request_id` (response arrival).
    async fn update_row(&self, request_id: &str, row: DurableRow) -> Result<()>;
}

/// [`DurableStore`] backed by an in-process table, standing in for a real
/// key-value service in tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryDurableStore {
    rows: Mutex<HashMap<String, DurableRow>>,
}

impl InMemoryDurableStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableStore for InMemoryDurableStore {
    async fn get_row(&self, request_id: &str) -> Result<Option<DurableRow>> {
        Ok(self.rows.lock().await.get(request_id).cloned())
    }

    async fn put_pending_row(&self, request_id: &str, row: DurableRow) -> Result<()> {
        self.rows.lock().await.insert(request_id.to_string(), row);
        Ok(())
    }

    async fn update_row(&self, request_id: &str, row: DurableRow) -> Result<()> {
        self.rows.lock().await.insert(request_id.to_string(), row);
        Ok(())
    }
}

/// Lets two registries share one store: one held by this process'
/// [`DurableWaiterRegistry`], the other by whatever writes rows from outside
/// it, exactly as §4.H's "facade only reads" split requires.
#[async_trait]
impl<T: DurableStore> DurableStore for Arc<T> {
    async fn get_row(&self, request_id: &str) -> Result<Option<DurableRow>> {
        T::get_row(self, request_id).await
    }

    async fn put_pending_row(&self, request_id: &str, row: DurableRow) -> Result<()> {
        T::put_pending_row(self, request_id, row).await
    }

    async fn update_row(&self, request_id: &str, row: DurableRow) -> Result<()> {
        T::update_row(self, request_id, row).await
    }
}

/// A waiter registry that correlates request/response pairs through a
/// [`DurableStore`] instead of an in-process channel.
pub struct DurableWaiterRegistry<S: DurableStore> {
    store: S,
    poll_ms: u64,
}

impl<S: DurableStore> DurableWaiterRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store, poll_ms: DEFAULT_POLL_MS }
    }

    #[must_use]
    pub fn with_poll_ms(mut self, poll_ms: u64) -> Self {
        self.poll_ms = poll_ms;
        self
    }

    /// Writes a fresh pending row for `request_id`, expiring in
    /// [`PENDING_TTL_SECS`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the underlying store fails.
    pub async fn create_pending(&self, request_id: &str, request_data: String) -> Result<()> {
        let row = DurableRow {
            status: RowStatus::Pending,
            request_data,
            response_data: None,
            response_received_at: None,
            expires_at: crate::crypto::unix_now() + PENDING_TTL_SECS,
        };
        self.store.put_pending_row(request_id, row).await
    }

    /// Records an incoming response rumor against `request_id`. Status
    /// becomes `Confirmed` if the rumor carries a `["status","confirmed"]`
    /// tag, `Denied` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the underlying store fails.
    pub async fn update_with_response(&self, request_id: &str, rumor: &Rumor) -> Result<()> {
        let status = if rumor.tag_value("status") == Some("confirmed") {
            RowStatus::Confirmed
        } else {
            RowStatus::Denied
        };
        let response_data =
            serde_json::to_string(rumor).map_err(|e| Error::Store(e.to_string()))?;
        let existing = self.store.get_row(request_id).await?;
        let request_data = existing.map(|r| r.request_data).unwrap_or_default();
        let row = DurableRow {
            status,
            request_data,
            response_data: Some(response_data),
            response_received_at: Some(crate::crypto::unix_now()),
            expires_at: crate::crypto::unix_now() + PENDING_TTL_SECS,
        };
        self.store.update_row(request_id, row).await
    }

    /// Polls the store every `poll_ms` until `request_id`'s row settles
    /// (status != `Pending` and a response is recorded) or `timeout_ms`
    /// elapses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no row exists, [`Error::Timeout`] once
    /// `timeout_ms` elapses with the row still pending, or [`Error::Store`]
    /// if the response can't be deserialized back into a [`Rumor`].
    pub async fn wait(&self, request_id: String, timeout_ms: u64) -> Result<Rumor> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            match self.store.get_row(&request_id).await {
                Ok(Some(row)) if row.status != RowStatus::Pending => {
                    let response_data = row.response_data.ok_or_else(|| {
                        Error::Store(format!("row for {request_id} settled with no response"))
                    })?;
                    return serde_json::from_str(&response_data)
                        .map_err(|e| Error::Store(e.to_string()));
                }
                Ok(Some(_)) => {}
                Ok(None) => return Err(Error::NotFound(request_id)),
                Err(e) => tracing::warn!(request_id = %request_id, error = %e, "durable store poll failed, retrying"),
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Timeout(timeout_ms));
            }
            tokio::time::sleep(Duration::from_millis(self.poll_ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_rumor(status: &str) -> Rumor {
        Rumor {
            id: "r".repeat(64),
            pubkey: "p".repeat(64),
            created_at: 0,
            kind: 9902,
            tags: vec![vec!["status".to_string(), status.to_string()]],
            content: String::new(),
        }
    }

    #[tokio::test]
    async fn create_pending_then_wait_times_out_while_pending() {
        let registry = DurableWaiterRegistry::new(InMemoryDurableStore::new()).with_poll_ms(5);
        registry.create_pending("req1", "{}".to_string()).await.unwrap();
        let result = registry.wait("req1".to_string(), 30).await;
        assert!(matches!(result, Err(Error::Timeout(30))));
    }

    #[tokio::test]
    async fn wait_resolves_once_confirmed_response_recorded() {
        let registry = DurableWaiterRegistry::new(InMemoryDurableStore::new()).with_poll_ms(5);
        registry.create_pending("req1", "{}".to_string()).await.unwrap();
        registry.update_with_response("req1", &response_rumor("confirmed")).await.unwrap();
        let rumor = registry.wait("req1".to_string(), 1000).await.unwrap();
        assert_eq!(rumor.id, "r".repeat(64));
    }

    #[tokio::test]
    async fn denied_status_derived_from_missing_confirmed_tag() {
        let store = InMemoryDurableStore::new();
        let registry = DurableWaiterRegistry::new(store);
        registry.create_pending("req1", "{}".to_string()).await.unwrap();
        registry.update_with_response("req1", &response_rumor("declined")).await.unwrap();
        let row = registry.store.get_row("req1").await.unwrap().unwrap();
        assert_eq!(row.status, RowStatus::Denied);
    }

    #[tokio::test]
    async fn wait_for_unknown_request_fails_not_found() {
        let registry = DurableWaiterRegistry::new(InMemoryDurableStore::new()).with_poll_ms(5);
        let result = registry.wait("nobody".to_string(), 30).await;
        assert!(matches!(result, Err(Error::NotFound(id)) if id == "nobody"));
    }

    #[tokio::test]
    async fn concurrent_waiter_observes_response_written_after_wait_starts() {
        use std::sync::Arc;

        let registry = Arc::new(DurableWaiterRegistry::new(InMemoryDurableStore::new()).with_poll_ms(5));
        registry.create_pending("req1", "{}".to_string()).await.unwrap();

        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.wait("req1".to_string(), 2000).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        registry.update_with_response("req1", &response_rumor("confirmed")).await.unwrap();

        let rumor = waiter.await.unwrap().unwrap();
        assert_eq!(rumor.id, "r".repeat(64));
    }

    #[tokio::test]
    async fn two_registries_over_one_shared_store_correlate_like_one() {
        let store = Arc::new(InMemoryDurableStore::new());
        let writer_side = DurableWaiterRegistry::new(store.clone());
        let reader_side = DurableWaiterRegistry::new(store).with_poll_ms(5);

        writer_side.create_pending("req1", "{}".to_string()).await.unwrap();
        let waiter = tokio::spawn(async move { reader_side.wait("req1".to_string(), 1000).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        writer_side.update_with_response("req1", &response_rumor("confirmed")).await.unwrap();

        let rumor = waiter.await.unwrap().unwrap();
        assert_eq!(rumor.id, "r".repeat(64));
    }
}
