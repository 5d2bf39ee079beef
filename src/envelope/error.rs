//! Error types for the envelope builder/opener (seal/wrap transforms).

use thiserror::Error;

/// Error type for envelope operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An event did not have the `kind` the operation requires.
    #[error("expected kind {expected}, got {got}")]
    WrongKind {
        /// Kind required by the caller.
        expected: u16,
        /// Kind actually observed.
        got: u16,
    },

    /// Decryption of the inner layer failed.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// The decrypted inner layer did not parse as a well-formed event.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The recovered rumor's `pubkey` did not match the seal's signer
    /// (anti-impersonation check, §4.B).
    #[error("author mismatch: rumor pubkey does not match seal pubkey")]
    AuthorMismatch,

    /// A lower-level crypto primitive failed.
    #[error(transparent)]
    Crypto(#[from] crate::crypto::Error),
}

/// Result type alias for envelope operations.
pub type Result<T> = std::result::Result<T, Error>;
