//! `wrap`/`unwrap`: the `kind = 1059` outer layer of the envelope chain (§4.B).

use crate::crypto::{self, event_id, parse_pubkey_hex, EphemeralKeypair, Keypair};

use super::error::{Error, Result};
use super::model::{Event, KIND_GIFT_WRAP, KIND_SEAL};

/// Wraps a seal for `recipient_pk` using a fresh ephemeral keypair.
///
/// Produces a `kind = 1059` event tagged `[["p", recipient_pk]]`, signed by
/// the ephemeral key, which is generated inside this function and dropped
/// (zeroized) before returning — it is never reused and never returned to
/// the caller.
///
/// # Errors
///
/// Returns [`Error::Crypto`] if `recipient_pk_hex` is malformed or
/// encryption/signing fails.
pub fn wrap(seal_event: &Event, recipient_pk_hex: &str) -> Result<Event> {
    let recipient_pk = parse_pubkey_hex(recipient_pk_hex)?;
    let ephemeral = EphemeralKeypair::generate();

    let conv_key = crypto::conversation_key(&ephemeral.secret_bytes(), &recipient_pk)?;
    let seal_json = serde_json::to_string(seal_event).map_err(|e| Error::MalformedPayload(e.to_string()))?;
    let content = crypto::encrypt(seal_json.as_bytes(), &conv_key)?;

    let pubkey = ephemeral.pubkey_hex();
    let created_at = crypto::jittered_now();
    let tags = vec![vec!["p".to_string(), recipient_pk_hex.to_string()]];
    let id = event_id(&pubkey, created_at, KIND_GIFT_WRAP, &tags, &content);
    let sig = ephemeral.sign(&id)?;

    Ok(Event {
        id: hex::encode(id),
        pubkey,
        created_at,
        kind: KIND_GIFT_WRAP,
        tags,
        content,
        sig: hex::encode(sig),
    })
    // `ephemeral` is dropped here; its secret bytes are zeroized.
}

/// Unwraps a `kind = 1059` gift wrap addressed to `recipient_sk`.
///
/// # Errors
///
/// Returns [`Error::WrongKind`] if `wrap_event.kind != 1059`,
/// [`Error::Crypto`] if decryption fails, or [`Error::MalformedPayload`] if
/// the decrypted content is not a well-formed event.
pub fn unwrap(wrap_event: &Event, recipient_sk: &Keypair) -> Result<Event> {
    if wrap_event.kind != KIND_GIFT_WRAP {
        return Err(Error::WrongKind { expected: KIND_GIFT_WRAP, got: wrap_event.kind });
    }
    let ephemeral_pk = parse_pubkey_hex(&wrap_event.pubkey)?;
    let conv_key = crypto::conversation_key(&recipient_sk.secret_bytes(), &ephemeral_pk)?;
    let seal_json = crypto::decrypt(&wrap_event.content, &conv_key)?;
    let seal_event: Event =
        serde_json::from_slice(&seal_json).map_err(|e| Error::MalformedPayload(e.to_string()))?;
    if seal_event.kind != KIND_SEAL {
        return Err(Error::WrongKind { expected: KIND_SEAL, got: seal_event.kind });
    }
    Ok(seal_event)
}
