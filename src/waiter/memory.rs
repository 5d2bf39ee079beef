//! In-memory waiter registry (component G): correlates a published
//! request with the response rumor a subscriber later delivers.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::envelope::Rumor;

use super::error::{Error, Result};
use super::WaiterRegistry;

/// Default waiter deadline (§5): 30 seconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

type Responder = oneshot::Sender<std::result::Result<Rumor, Error>>;
type ResponseRx = oneshot::Receiver<std::result::Result<Rumor, Error>>;

/// A process-local table of pending request/response correlations.
#[derive(Default)]
pub struct MemoryWaiterRegistry {
    waiters: Mutex<HashMap<String, Responder>>,
    /// Receivers created by [`register`](Self::register) ahead of the
    /// matching `wait` call, parked here until `wait` claims them.
    pending_rx: Mutex<HashMap<String, ResponseRx>>,
}

impl MemoryWaiterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for `request_id` synchronously, with no `.await`
    /// — so a caller can register, publish, and only afterwards call
    /// [`wait`](Self::wait), with no window in which a fast delivery could
    /// race ahead of the registration (§4.I step 2 must precede step 4).
    /// A `wait` call for an id that was never `register`ed first still
    /// registers itself, exactly as before.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyWaiting`] if a waiter is already registered
    /// for `request_id`.
    pub fn register(&self, request_id: &str) -> Result<()> {
        let mut waiters = self.waiters.lock().unwrap();
        if waiters.contains_key(request_id) {
            return Err(Error::AlreadyWaiting(request_id.to_string()));
        }
        let (tx, rx) = oneshot::channel();
        waiters.insert(request_id.to_string(), tx);
        drop(waiters);
        self.pending_rx.lock().unwrap().insert(request_id.to_string(), rx);
        Ok(())
    }

    /// Awaits the response for `request_id`, which resolves once
    /// [`deliver`](Self::deliver) or [`cancel`](Self::cancel) completes it,
    /// or `timeout_ms` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyWaiting`] if a waiter is already registered
    /// for `request_id`, [`Error::Timeout`] on deadline, or
    /// [`Error::Cancelled`] if cancelled before delivery.
    pub async fn wait(&self, request_id: String, timeout_ms: u64) -> Result<Rumor> {
        let rx = match self.pending_rx.lock().unwrap().remove(&request_id) {
            Some(rx) => rx,
            None => {
                let mut waiters = self.waiters.lock().unwrap();
                if waiters.contains_key(&request_id) {
                    return Err(Error::AlreadyWaiting(request_id));
                }
                let (tx, rx) = oneshot::channel();
                waiters.insert(request_id.clone(), tx);
                rx
            }
        };

        match tokio::time::timeout(Duration::from_millis(timeout_ms), rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                self.waiters.lock().unwrap().remove(&request_id);
                Err(Error::Cancelled("sender dropped without a response".to_string()))
            }
            Err(_) => {
                self.waiters.lock().unwrap().remove(&request_id);
                Err(Error::Timeout(timeout_ms))
            }
        }
    }

    /// Looks for an `["e", rid, ...]` tag in `rumor.tags`; if a waiter
    /// exists for `rid`, completes it and returns `true`. A second delivery
    /// for an already-completed id returns `false` (no waiter remains).
    pub fn deliver(&self, rumor: &Rumor) -> bool {
        let Some(request_id) = rumor.tag_value("e") else { return false };
        let sender = self.waiters.lock().unwrap().remove(request_id);
        sender.is_some_and(|tx| tx.send(Ok(rumor.clone())).is_ok())
    }

    /// Completes the waiter for `request_id` with [`Error::Cancelled`].
    pub fn cancel(&self, request_id: &str) -> bool {
        let sender = self.waiters.lock().unwrap().remove(request_id);
        sender.is_some_and(|tx| tx.send(Err(Error::Cancelled(request_id.to_string()))).is_ok())
    }

    /// Cancels every pending waiter with `Cancelled("all")`.
    pub fn cancel_all(&self) {
        let waiters: Vec<_> = self.waiters.lock().unwrap().drain().collect();
        for (_, tx) in waiters {
            let _ = tx.send(Err(Error::Cancelled("all".to_string())));
        }
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.waiters.lock().unwrap().len()
    }

    #[must_use]
    pub fn pending_ids(&self) -> Vec<String> {
        self.waiters.lock().unwrap().keys().cloned().collect()
    }

    #[must_use]
    pub fn is_pending(&self, request_id: &str) -> bool {
        self.waiters.lock().unwrap().contains_key(request_id)
    }
}

#[async_trait]
impl WaiterRegistry for MemoryWaiterRegistry {
    async fn register(&self, request_id: &str, _request_data: &str) -> Result<()> {
        Self::register(self, request_id)
    }

    async fn wait(&self, request_id: String, timeout_ms: u64) -> Result<Rumor> {
        Self::wait(self, request_id, timeout_ms).await
    }

    async fn cancel(&self, request_id: &str) {
        Self::cancel(self, request_id);
    }

    async fn cancel_all(&self) {
        Self::cancel_all(self);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    /// Yields a handful of times so a just-`spawn`ed `wait` future reaches
    /// its registration point (and first suspension) before the test
    /// delivers/cancels against it — `wait`'s body, including the
    /// `waiters.insert`, does not run until the future is polled.
    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    fn sample_response_rumor(request_id: &str) -> Rumor {
        Rumor {
            id: "r".repeat(64),
            pubkey: "p".repeat(64),
            created_at: 0,
            kind: 9902,
            tags: vec![vec!["e".to_string(), request_id.to_string(), String::new(), "root".to_string()]],
            content: String::new(),
        }
    }

    #[tokio::test]
    async fn wait_resolves_on_deliver() {
        let registry = Arc::new(MemoryWaiterRegistry::new());
        let wait_task = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.wait("req1".to_string(), 1000).await })
        };
        settle().await;
        let delivered = registry.deliver(&sample_response_rumor("req1"));
        assert!(delivered);
        let rumor = wait_task.await.unwrap().unwrap();
        assert_eq!(rumor.id, "r".repeat(64));
    }

    #[tokio::test]
    async fn second_wait_for_same_id_fails_already_waiting() {
        let registry = Arc::new(MemoryWaiterRegistry::new());
        let _first = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.wait("req1".to_string(), 1000).await })
        };
        settle().await;
        let second = registry.wait("req1".to_string(), 1000).await;
        assert!(matches!(second, Err(Error::AlreadyWaiting(id)) if id == "req1"));
    }

    #[tokio::test]
    async fn wait_times_out_and_removes_entry() {
        let registry = MemoryWaiterRegistry::new();
        let result = registry.wait("req1".to_string(), 20).await;
        assert!(matches!(result, Err(Error::Timeout(20))));
        assert!(!registry.is_pending("req1"));
    }

    #[tokio::test]
    async fn deliver_with_no_waiter_returns_false() {
        let registry = MemoryWaiterRegistry::new();
        assert!(!registry.deliver(&sample_response_rumor("nobody-waiting")));
    }

    #[tokio::test]
    async fn deliver_twice_is_idempotent() {
        let registry = Arc::new(MemoryWaiterRegistry::new());
        let wait_task = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.wait("req1".to_string(), 1000).await })
        };
        settle().await;
        assert!(registry.deliver(&sample_response_rumor("req1")));
        assert!(!registry.deliver(&sample_response_rumor("req1")));
        wait_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn cancel_completes_waiter_with_cancelled() {
        let registry = Arc::new(MemoryWaiterRegistry::new());
        let wait_task = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.wait("req1".to_string(), 1000).await })
        };
        settle().await;
        assert!(registry.cancel("req1"));
        assert!(matches!(wait_task.await.unwrap(), Err(Error::Cancelled(_))));
    }

    #[tokio::test]
    async fn cancel_all_cancels_every_pending_waiter() {
        let registry = Arc::new(MemoryWaiterRegistry::new());
        let a = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.wait("a".to_string(), 1000).await })
        };
        let b = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.wait("b".to_string(), 1000).await })
        };
        settle().await;
        registry.cancel_all();
        assert!(matches!(a.await.unwrap(), Err(Error::Cancelled(_))));
        assert!(matches!(b.await.unwrap(), Err(Error::Cancelled(_))));
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn register_runs_synchronously_so_a_delivery_before_wait_is_not_lost() {
        let registry = MemoryWaiterRegistry::new();
        registry.register("req1").unwrap();
        // No `.await` has happened yet for this id, but the waiter is
        // already in the table, so delivering now (before `wait` is ever
        // called) still reaches it.
        assert!(registry.deliver(&sample_response_rumor("req1")));
        let rumor = registry.wait("req1".to_string(), 1000).await.unwrap();
        assert_eq!(rumor.id, "r".repeat(64));
    }

    #[tokio::test]
    async fn register_twice_for_same_id_fails_already_waiting() {
        let registry = MemoryWaiterRegistry::new();
        registry.register("req1").unwrap();
        assert!(matches!(registry.register("req1"), Err(Error::AlreadyWaiting(id)) if id == "req1"));
    }

    #[tokio::test]
    async fn pending_ids_reports_all_outstanding_requests() {
        let registry = Arc::new(MemoryWaiterRegistry::new());
        let _a = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.wait("a".to_string(), 1000).await })
        };
        let _b = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.wait("b".to_string(), 1000).await })
        };
        settle().await;
        let mut ids = registry.pending_ids();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }
}
