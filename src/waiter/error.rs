//! Error type shared by the in-memory and durable waiter registries (§4.G/§4.H).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A waiter is already registered for this request id.
    #[error("a waiter is already registered for request {0}")]
    AlreadyWaiting(String),

    /// The waiter's deadline elapsed before a response arrived.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// The waiter was explicitly cancelled before delivery.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// A durable row was not found for the given request id.
    #[error("no row found for request {0}")]
    NotFound(String),

    /// The durable key-value store failed.
    #[error("durable store error: {0}")]
    Store(String),
}

/// Result type for waiter-registry operations.
pub type Result<T> = std::result::Result<T, Error>;
