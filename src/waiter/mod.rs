//! Request/response correlation (components G and H).
//!
//! A waiter registry is how [`crate::facade`] turns "publish a request and
//! get back a future" into a fire-and-forget `publish` plus an out-of-band
//! delivery from [`crate::subscriber`] (or, for the durable registry, an
//! out-of-process writer). Two implementations share one contract (§9 "two
//! registries, one contract"):
//!
//! ```text
//! memory.rs   in-process oneshot channels, torn down with the process
//! durable.rs  poll-backed, correlation survives a restart
//! ```
//!
//! `register` MUST complete before the caller publishes its request, so
//! that a reply arriving unusually fast cannot race ahead of the
//! registration; `wait` then blocks for the result. A bare `wait` with no
//! prior `register` still works (it registers for itself), which is all
//! the in-process registry's own tests need.

mod durable;
mod error;
mod memory;

pub use durable::{
    DurableStore, DurableWaiterRegistry, DurableRow, InMemoryDurableStore, RowStatus,
    DEFAULT_POLL_MS, PENDING_TTL_SECS,
};
pub use error::{Error, Result};
pub use memory::{MemoryWaiterRegistry, DEFAULT_TIMEOUT_MS};

use async_trait::async_trait;

use crate::envelope::Rumor;

/// The operations both waiter registries share, so the facade can select
/// either one behind a single `Arc<dyn WaiterRegistry>` at start-up.
#[async_trait]
pub trait WaiterRegistry: Send + Sync {
    /// Registers interest in `request_id` *before* anything is published
    /// for it (§4.I step 2 must precede step 4). `request_data` is an
    /// opaque serialized copy of the request, recorded by registries (like
    /// the durable one) whose row needs it; the in-memory registry ignores
    /// it.
    ///
    /// # Errors
    ///
    /// Returns a registry-specific [`Error`] — at minimum
    /// [`Error::AlreadyWaiting`] if `request_id` is already registered.
    async fn register(&self, request_id: &str, request_data: &str) -> Result<()>;

    /// Blocks until the response rumor correlated with `request_id`
    /// arrives, or `timeout_ms` elapses.
    ///
    /// # Errors
    ///
    /// Returns a registry-specific [`Error`] — at minimum [`Error::Timeout`]
    /// once `timeout_ms` elapses with no response.
    async fn wait(&self, request_id: String, timeout_ms: u64) -> Result<Rumor>;

    /// Completes the waiter for `request_id` early, e.g. after a publish
    /// that no relay accepted. The in-memory registry wakes the waiter
    /// immediately with [`Error::Cancelled`]; the durable registry's rows
    /// instead expire via their own TTL, so this defaults to a no-op.
    async fn cancel(&self, _request_id: &str) {}

    /// Completes every outstanding waiter, e.g. on process shutdown.
    /// Defaults to a no-op for registries (like the durable one) with
    /// nothing in-process to wake.
    async fn cancel_all(&self) {}
}

#[async_trait]
impl<S: DurableStore> WaiterRegistry for DurableWaiterRegistry<S> {
    async fn register(&self, request_id: &str, request_data: &str) -> Result<()> {
        self.create_pending(request_id, request_data.to_string()).await
    }

    async fn wait(&self, request_id: String, timeout_ms: u64) -> Result<Rumor> {
        DurableWaiterRegistry::wait(self, request_id, timeout_ms).await
    }
}
