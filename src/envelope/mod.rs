//! Envelope builder/opener (component B): rumor ↔ seal ↔ gift-wrap transforms.
//!
//! ```text
//! rumor.rs  make_rumor
//! seal.rs   seal, unseal    (kind 13)
//! wrap.rs   wrap, unwrap    (kind 1059)
//! ```
//!
//! [`open`] composes `unwrap` + `unseal` and performs the anti-impersonation
//! check the spec requires of every caller (§4.B: "callers MUST re-verify
//! `rumor.pubkey == seal.pubkey`") in one place, so [`crate::subscriber`]
//! and tests cannot forget it.

mod error;
mod model;
mod rumor;
mod seal;
mod wrap;

pub use error::{Error, Result};
pub use model::{Event, Rumor, KIND_GIFT_WRAP, KIND_SEAL};
pub use rumor::{make_rumor, RumorPartial};
pub use seal::{seal, unseal};
pub use wrap::{unwrap, wrap};

use crate::crypto::Keypair;

/// Fully opens a gift wrap addressed to `recipient_sk`: unwraps, unseals,
/// and checks authorship. Returns the recovered rumor.
///
/// # Errors
///
/// Returns [`Error::WrongKind`] if the outer event is not `kind = 1059` or
/// the inner layer is not `kind = 13`, [`Error::Crypto`] on decryption
/// failure, [`Error::MalformedPayload`] if either layer does not parse, or
/// [`Error::AuthorMismatch`] if the recovered rumor's `pubkey` does not
/// match the seal's signer.
pub fn open(wrap_event: &Event, recipient_sk: &Keypair) -> Result<Rumor> {
    let seal_event = wrap::unwrap(wrap_event, recipient_sk)?;
    let rumor = seal::unseal(&seal_event, recipient_sk)?;
    if rumor.pubkey != seal_event.pubkey {
        return Err(Error::AuthorMismatch);
    }
    Ok(rumor)
}
