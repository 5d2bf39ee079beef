//! Error types for the crypto primitives module.

use thiserror::Error;

/// Error type for crypto operations (key parsing, signing, encryption).
#[derive(Error, Debug)]
pub enum Error {
    /// A secret key was malformed or out of curve order.
    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),

    /// A public key was malformed or not a valid curve point.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// A bech32 (nsec1/npub1) string failed to decode.
    #[error("invalid bech32 key: {0}")]
    InvalidBech32(String),

    /// Authenticated encryption failed (padding, length bounds, HMAC setup).
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Authenticated decryption failed: wrong key, corruption, or unknown version.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Schnorr signing failed.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// Schnorr signature verification failed.
    #[error("signature verification failed")]
    VerificationFailed,

    /// Hex decoding failed.
    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Result type alias for crypto operations.
pub type Result<T> = std::result::Result<T, Error>;
