//! `seal`/`unseal`: the `kind = 13` layer of the envelope chain (§4.B).

use crate::crypto::{self, event_id, parse_pubkey_hex, Keypair};

use super::error::{Error, Result};
use super::model::{Event, Rumor, KIND_SEAL};

/// Seals a rumor for `recipient_pk`, signed by `author_sk`.
///
/// Produces a `kind = 13` event with empty tags and a jittered
/// `created_at` (the seal's timestamp, not the rumor's, is randomised —
/// see [`crate::crypto::jittered_now`]).
///
/// # Errors
///
/// Returns [`Error::Crypto`] if `recipient_pk_hex` is malformed or
/// encryption/signing fails.
pub fn seal(rumor: &Rumor, author_sk: &Keypair, recipient_pk_hex: &str) -> Result<Event> {
    let recipient_pk = parse_pubkey_hex(recipient_pk_hex)?;
    let conv_key = crypto::conversation_key(&author_sk.secret_bytes(), &recipient_pk)?;
    let rumor_json = serde_json::to_string(rumor).map_err(|e| Error::MalformedPayload(e.to_string()))?;
    let content = crypto::encrypt(rumor_json.as_bytes(), &conv_key)?;

    let pubkey = author_sk.pubkey_hex();
    let created_at = crypto::jittered_now();
    let tags: Vec<Vec<String>> = Vec::new();
    let id = event_id(&pubkey, created_at, KIND_SEAL, &tags, &content);
    let sig = author_sk.sign(&id)?;

    Ok(Event {
        id: hex::encode(id),
        pubkey,
        created_at,
        kind: KIND_SEAL,
        tags,
        content,
        sig: hex::encode(sig),
    })
}

/// Opens a `kind = 13` seal addressed (by conversation key) to `recipient_sk`.
///
/// Callers MUST separately re-verify `rumor.pubkey == seal.pubkey`; this
/// function does not — `unwrap_and_unseal` in [`super`] performs that check
/// once both layers are available, per §4.B's explicit caller obligation.
///
/// # Errors
///
/// Returns [`Error::WrongKind`] if `seal_event.kind != 13`,
/// [`Error::Crypto`] if the recipient's public key is malformed or
/// decryption fails, or [`Error::MalformedPayload`] if the decrypted
/// content is not a well-formed rumor.
pub fn unseal(seal_event: &Event, recipient_sk: &Keypair) -> Result<Rumor> {
    if seal_event.kind != KIND_SEAL {
        return Err(Error::WrongKind { expected: KIND_SEAL, got: seal_event.kind });
    }
    let sender_pk = parse_pubkey_hex(&seal_event.pubkey)?;
    let conv_key = crypto::conversation_key(&recipient_sk.secret_bytes(), &sender_pk)?;
    let rumor_json = crypto::decrypt(&seal_event.content, &conv_key)?;
    let rumor: Rumor =
        serde_json::from_slice(&rumor_json).map_err(|e| Error::MalformedPayload(e.to_string()))?;
    Ok(rumor)
}
