//! NIP-01 event id computation and Schnorr signature verification.

use secp256k1::{schnorr, Message, XOnlyPublicKey};
use sha2::{Digest, Sha256};

use super::error::{Error, Result};
use super::keys::SECP;

/// Computes the 32-byte event id: SHA-256 of the canonical JSON array
/// `[0, pubkey, created_at, kind, tags, content]`.
///
/// Canonicalisation is delegated to `serde_json`'s default compact
/// serialization of an array of primitives, which already omits
/// whitespace and does not escape `/`, matching NIP-01.
#[must_use]
pub fn event_id(pubkey_hex: &str, created_at: i64, kind: u16, tags: &[Vec<String>], content: &str) -> [u8; 32] {
    let value = serde_json::json!([0, pubkey_hex, created_at, kind, tags, content]);
    let serialized = serde_json::to_string(&value).expect("array of JSON primitives always serializes");
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    hasher.finalize().into()
}

/// Verifies a BIP-340 Schnorr signature over an event id.
///
/// # Errors
///
/// Returns [`Error::InvalidPublicKey`] or a hex/length error if `pubkey_hex`
/// or `sig_hex` are malformed; otherwise returns `Ok(false)` for a
/// well-formed but invalid signature (never an error — matching the
/// convention that verification failure is a boolean outcome, not an
/// exceptional one).
pub fn verify(id: &[u8; 32], sig_hex: &str, pubkey_hex: &str) -> Result<bool> {
    let pubkey_bytes = hex::decode(pubkey_hex)?;
    let pubkey_bytes: [u8; 32] = pubkey_bytes
        .try_into()
        .map_err(|_| Error::InvalidPublicKey("public key must be 32 bytes".to_string()))?;
    let xonly = XOnlyPublicKey::from_slice(&pubkey_bytes).map_err(|e| Error::InvalidPublicKey(e.to_string()))?;

    let sig_bytes = hex::decode(sig_hex)?;
    if sig_bytes.len() != 64 {
        return Err(Error::InvalidPublicKey(format!(
            "signature must be 64 bytes, got {}",
            sig_bytes.len()
        )));
    }
    let signature = schnorr::Signature::from_slice(&sig_bytes).map_err(|e| Error::InvalidPublicKey(e.to_string()))?;
    let message = Message::from_digest(*id);
    Ok(SECP.verify_schnorr(&signature, &message, &xonly).is_ok())
}

#[cfg(test)]
mod tests {
    use super::super::keys::Keypair;
    use super::*;

    #[test]
    fn event_id_is_deterministic() {
        let id1 = event_id("abc", 100, 1, &[], "hello");
        let id2 = event_id("abc", 100, 1, &[], "hello");
        assert_eq!(id1, id2);
    }

    #[test]
    fn event_id_changes_with_content() {
        let id1 = event_id("abc", 100, 1, &[], "hello");
        let id2 = event_id("abc", 100, 1, &[], "world");
        assert_ne!(id1, id2);
    }

    #[test]
    fn event_id_stable_under_tag_order() {
        let tags_a = vec![vec!["p".to_string(), "x".to_string()]];
        let id1 = event_id("abc", 100, 1, &tags_a, "");
        // same tags, re-derived from a fresh Vec (serialisation round-trip)
        let tags_b: Vec<Vec<String>> =
            serde_json::from_str(&serde_json::to_string(&tags_a).unwrap()).unwrap();
        let id2 = event_id("abc", 100, 1, &tags_b, "");
        assert_eq!(id1, id2);
    }

    #[test]
    fn sign_then_verify_succeeds() {
        let kp = Keypair::generate();
        let id = event_id(&kp.pubkey_hex(), 100, 1, &[], "hi");
        let sig = kp.sign(&id).unwrap();
        assert!(verify(&id, &hex::encode(sig), &kp.pubkey_hex()).unwrap());
    }

    #[test]
    fn verify_fails_for_wrong_signer() {
        let kp = Keypair::generate();
        let other = Keypair::generate();
        let id = event_id(&kp.pubkey_hex(), 100, 1, &[], "hi");
        let sig = kp.sign(&id).unwrap();
        assert!(!verify(&id, &hex::encode(sig), &other.pubkey_hex()).unwrap());
    }

    #[test]
    fn verify_fails_for_tampered_id() {
        let kp = Keypair::generate();
        let id = event_id(&kp.pubkey_hex(), 100, 1, &[], "hi");
        let sig = kp.sign(&id).unwrap();
        let other_id = event_id(&kp.pubkey_hex(), 100, 1, &[], "bye");
        assert!(!verify(&other_id, &hex::encode(sig), &kp.pubkey_hex()).unwrap());
    }

    #[test]
    fn verify_rejects_short_signature() {
        let kp = Keypair::generate();
        let id = [0u8; 32];
        assert!(verify(&id, "abcd", &kp.pubkey_hex()).is_err());
    }

    #[test]
    fn verify_rejects_short_pubkey() {
        let id = [0u8; 32];
        assert!(verify(&id, &"00".repeat(64), "abcd").is_err());
    }
}
