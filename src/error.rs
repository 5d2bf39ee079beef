//! Top-level error kinds surfaced to callers of the facade.
//!
//! Per-module errors (`crypto::Error`, `envelope::Error`, ...) carry the
//! detail needed for debugging; they collapse into `CoreError` at the
//! facade boundary so that the only things a caller of `request_response`
//! ever sees are a success rumor, a [`CoreError::Timeout`], or a
//! [`CoreError::PublishFailed`] (see §7 propagation policy).

use thiserror::Error;

/// Error kinds reachable from the public facade.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration failed validation at start-up.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A rumor builder rejected its input.
    #[error("rumor builder rejected input: {0}")]
    BuildInvalid(String),

    /// Authenticated encryption failed.
    #[error("encryption failed: {0}")]
    EncryptFailed(String),

    /// Authenticated decryption failed (wrong key, corruption, or unknown version).
    #[error("decryption failed: {0}")]
    DecryptFailed(String),

    /// The recovered rumor's `pubkey` did not match the seal's signer.
    #[error("author mismatch: recovered rumor was not authored by the seal's signer")]
    AuthorMismatch,

    /// An event did not have the expected `kind`.
    #[error("unexpected event kind: expected {expected}, got {got}")]
    WrongKind {
        /// Kind required by the caller.
        expected: u16,
        /// Kind actually observed.
        got: u16,
    },

    /// Zero of the attempted relays accepted the event.
    #[error("publish failed: 0 of {attempted} relays accepted the event")]
    PublishFailed {
        /// Number of relays the publisher attempted.
        attempted: usize,
    },

    /// A relay sent a frame that did not conform to the wire protocol.
    #[error("relay protocol error: {0}")]
    RelayProtocolError(String),

    /// A waiter (or durable poll) exceeded its deadline without delivery.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// A waiter was already registered for this request id.
    #[error("a waiter is already registered for request {0}")]
    AlreadyWaiting(String),

    /// The waiter was explicitly cancelled before delivery.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// A durable row was not found for the given request id.
    #[error("durable row not found for request {0}")]
    NotFound(String),
}

impl From<crate::crypto::Error> for CoreError {
    fn from(err: crate::crypto::Error) -> Self {
        match err {
            crate::crypto::Error::EncryptionFailed(msg) => Self::EncryptFailed(msg),
            crate::crypto::Error::DecryptionFailed(msg) => Self::DecryptFailed(msg),
            other => Self::EncryptFailed(other.to_string()),
        }
    }
}

impl From<crate::envelope::Error> for CoreError {
    fn from(err: crate::envelope::Error) -> Self {
        match err {
            crate::envelope::Error::WrongKind { expected, got } => Self::WrongKind { expected, got },
            crate::envelope::Error::DecryptionFailed(msg) => Self::DecryptFailed(msg),
            crate::envelope::Error::MalformedPayload(msg) => Self::DecryptFailed(msg),
            crate::envelope::Error::AuthorMismatch => Self::AuthorMismatch,
            crate::envelope::Error::Crypto(inner) => inner.into(),
        }
    }
}

impl From<crate::rumor::Error> for CoreError {
    fn from(err: crate::rumor::Error) -> Self {
        match err {
            crate::rumor::Error::Invalid(msg) => Self::BuildInvalid(msg),
        }
    }
}

impl From<crate::waiter::Error> for CoreError {
    fn from(err: crate::waiter::Error) -> Self {
        match err {
            crate::waiter::Error::AlreadyWaiting(id) => Self::AlreadyWaiting(id),
            crate::waiter::Error::Timeout(ms) => Self::Timeout(ms),
            crate::waiter::Error::Cancelled(reason) => Self::Cancelled(reason),
            crate::waiter::Error::NotFound(id) => Self::NotFound(id),
            crate::waiter::Error::Store(msg) => Self::NotFound(msg),
        }
    }
}

/// Result type alias for facade-level operations.
pub type Result<T> = std::result::Result<T, CoreError>;
