//! Keypair types for event signing and key agreement.
//!
//! Two distinct types exist on purpose, even though their internals overlap:
//! [`Keypair`] is a persistent identity (the caller's own signing key,
//! loaded once from configuration) while [`EphemeralKeypair`] is generated
//! fresh inside [`crate::envelope::wrap`] for a single gift wrap and then
//! dropped. Keeping them separate makes "never reuse an ephemeral key"
//! and "never persist an ephemeral key" checkable by type rather than by
//! convention.

use std::sync::LazyLock;

use bech32::Hrp;
use secp256k1::{Keypair as Secp256k1Keypair, Message, PublicKey, Secp256k1, SecretKey, XOnlyPublicKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::error::{Error, Result};

/// Global secp256k1 context, shared because constructing one precomputes
/// signing/verification tables and is expensive to repeat per call.
pub static SECP: LazyLock<Secp256k1<secp256k1::All>> = LazyLock::new(Secp256k1::new);

const NSEC_HRP: &str = "nsec";
const NPUB_HRP: &str = "npub";

fn derive_pubkey_bytes(secret_bytes: &[u8; 32]) -> Result<[u8; 32]> {
    let secret_key = SecretKey::from_slice(secret_bytes)
        .map_err(|e| Error::InvalidSecretKey(e.to_string()))?;
    let keypair = Secp256k1Keypair::from_secret_key(&SECP, &secret_key);
    let (xonly, _parity) = keypair.x_only_public_key();
    Ok(xonly.serialize())
}

/// A persistent identity keypair: the caller's own author key, or a
/// recipient's key known only by its public half.
#[derive(ZeroizeOnDrop)]
pub struct Keypair {
    secret_bytes: [u8; 32],
    #[zeroize(skip)]
    pubkey_bytes: [u8; 32],
}

impl Keypair {
    /// Generates a new random keypair using the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut rand::rngs::OsRng);
        let secret_bytes = secret_key.secret_bytes();
        let pubkey_bytes = derive_pubkey_bytes(&secret_bytes)
            .expect("freshly generated secret key is always valid");
        Self { secret_bytes, pubkey_bytes }
    }

    /// Builds a keypair from raw 32-byte secret key material.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSecretKey`] if the bytes are zero or exceed
    /// the curve order.
    pub fn from_secret_bytes(secret_bytes: [u8; 32]) -> Result<Self> {
        let pubkey_bytes = derive_pubkey_bytes(&secret_bytes)?;
        Ok(Self { secret_bytes, pubkey_bytes })
    }

    /// Builds a keypair from a 64-character hex-encoded secret key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Hex`] on malformed hex, [`Error::InvalidSecretKey`]
    /// on an out-of-range key.
    pub fn from_hex(secret_hex: &str) -> Result<Self> {
        let bytes = hex::decode(secret_hex)?;
        let secret_bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::InvalidSecretKey("secret key must be 32 bytes".to_string()))?;
        Self::from_secret_bytes(secret_bytes)
    }

    /// Builds a keypair from a bech32 `nsec1...` string.
    ///
    /// Decoding is strict: any failure (bad checksum, wrong human-readable
    /// part, wrong payload length) is an error — there is no fallback to
    /// treating the input as a literal key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBech32`] on any decode failure.
    pub fn from_bech32(nsec: &str) -> Result<Self> {
        let (hrp, data) =
            bech32::decode(nsec).map_err(|e| Error::InvalidBech32(e.to_string()))?;
        if hrp.as_str() != NSEC_HRP {
            return Err(Error::InvalidBech32(format!(
                "expected hrp '{NSEC_HRP}', got '{}'",
                hrp.as_str()
            )));
        }
        let secret_bytes: [u8; 32] = data
            .try_into()
            .map_err(|_| Error::InvalidBech32("nsec payload must be 32 bytes".to_string()))?;
        Self::from_secret_bytes(secret_bytes)
    }

    /// Encodes this keypair's public half as bech32 `npub1...`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBech32`] if encoding fails (unreachable for
    /// a valid 32-byte payload, but surfaced rather than unwrapped).
    pub fn pubkey_bech32(&self) -> Result<String> {
        let hrp = Hrp::parse(NPUB_HRP).map_err(|e| Error::InvalidBech32(e.to_string()))?;
        bech32::encode::<bech32::Bech32>(hrp, &self.pubkey_bytes)
            .map_err(|e| Error::InvalidBech32(e.to_string()))
    }

    /// Returns the public key as a 64-character hex string.
    #[must_use]
    pub fn pubkey_hex(&self) -> String {
        hex::encode(self.pubkey_bytes)
    }

    /// Returns the public key as raw bytes.
    #[must_use]
    pub const fn pubkey_bytes(&self) -> [u8; 32] {
        self.pubkey_bytes
    }

    /// Returns the secret key bytes. Exposed for conversation-key
    /// derivation only; callers must not persist or log the result.
    #[must_use]
    pub(crate) const fn secret_bytes(&self) -> [u8; 32] {
        self.secret_bytes
    }

    /// Signs a 32-byte message (an event id) with Schnorr (BIP-340).
    ///
    /// # Errors
    ///
    /// Returns [`Error::SigningFailed`] if the stored secret bytes no
    /// longer form a valid key (unreachable in practice, since every
    /// construction path validates them).
    pub fn sign(&self, message_hash: &[u8; 32]) -> Result<[u8; 64]> {
        let mut secret_bytes_copy = self.secret_bytes;
        let result = (|| {
            let secret_key = SecretKey::from_slice(&secret_bytes_copy)
                .map_err(|e| Error::SigningFailed(e.to_string()))?;
            let keypair = Secp256k1Keypair::from_secret_key(&SECP, &secret_key);
            let message = Message::from_digest(*message_hash);
            let signature = SECP.sign_schnorr(&message, &keypair);
            Ok(signature.serialize())
        })();
        secret_bytes_copy.zeroize();
        result
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey_hex())
            .finish()
    }
}

/// A one-time keypair generated inside `wrap` for a single gift wrap.
///
/// The secret bytes are zeroized on drop and this type is never
/// serialized or stored; each wrap must construct a fresh instance.
#[derive(ZeroizeOnDrop)]
pub struct EphemeralKeypair {
    secret_bytes: [u8; 32],
    #[zeroize(skip)]
    pubkey_bytes: [u8; 32],
}

impl EphemeralKeypair {
    /// Generates a new random ephemeral keypair.
    #[must_use]
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut rand::rngs::OsRng);
        let secret_bytes = secret_key.secret_bytes();
        let pubkey_bytes = derive_pubkey_bytes(&secret_bytes)
            .expect("freshly generated secret key is always valid");
        Self { secret_bytes, pubkey_bytes }
    }

    /// Returns the public key as a 64-character hex string.
    #[must_use]
    pub fn pubkey_hex(&self) -> String {
        hex::encode(self.pubkey_bytes)
    }

    /// Returns the secret key bytes for conversation-key derivation only.
    #[must_use]
    pub(crate) const fn secret_bytes(&self) -> [u8; 32] {
        self.secret_bytes
    }

    /// Signs a 32-byte message (an event id) with Schnorr (BIP-340).
    ///
    /// # Errors
    ///
    /// See [`Keypair::sign`].
    pub fn sign(&self, message_hash: &[u8; 32]) -> Result<[u8; 64]> {
        let mut secret_bytes_copy = self.secret_bytes;
        let result = (|| {
            let secret_key = SecretKey::from_slice(&secret_bytes_copy)
                .map_err(|e| Error::SigningFailed(e.to_string()))?;
            let keypair = Secp256k1Keypair::from_secret_key(&SECP, &secret_key);
            let message = Message::from_digest(*message_hash);
            let signature = SECP.sign_schnorr(&message, &keypair);
            Ok(signature.serialize())
        })();
        secret_bytes_copy.zeroize();
        result
    }
}

impl std::fmt::Debug for EphemeralKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralKeypair")
            .field("pubkey", &self.pubkey_hex())
            .finish()
    }
}

/// Parses a 64-character hex public key into a validated x-only point.
///
/// # Errors
///
/// Returns [`Error::InvalidPublicKey`] if the hex is malformed or the
/// bytes are not a valid curve point.
pub fn parse_pubkey_hex(pubkey_hex: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(pubkey_hex)?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| Error::InvalidPublicKey("public key must be 32 bytes".to_string()))?;
    XOnlyPublicKey::from_slice(&bytes).map_err(|e| Error::InvalidPublicKey(e.to_string()))?;
    Ok(bytes)
}

pub(crate) fn full_pubkey(xonly_bytes: &[u8; 32]) -> Result<PublicKey> {
    let xonly = XOnlyPublicKey::from_slice(xonly_bytes)
        .map_err(|e| Error::InvalidPublicKey(e.to_string()))?;
    Ok(PublicKey::from_x_only_public_key(xonly, secp256k1::Parity::Even))
}
