//! Crypto primitives (component A): shared-secret derivation, authenticated
//! symmetric encryption, event hashing, and signing.
//!
//! ```text
//! keys.rs      Keypair / EphemeralKeypair, secp256k1 context
//! nip44.rs     conversation_key, encrypt, decrypt
//! event_id.rs  event_id, verify
//! ```
//!
//! Timestamp jitter (`jittered_now`) lives here because it is part of the
//! crypto contract's privacy guarantee, not an envelope-layer detail: the
//! caller's rumor keeps its real `created_at`; only the seal and the wrap
//! use the jittered value.

mod error;
mod event_id;
mod keys;
mod nip44;

pub use error::{Error, Result};
pub use event_id::{event_id, verify};
pub use keys::{parse_pubkey_hex, EphemeralKeypair, Keypair};
pub use nip44::{conversation_key, decrypt, encrypt};

use rand::Rng;

/// Two days in seconds — the maximum backdating applied to sealed/wrapped
/// event timestamps, and therefore the subscriber's required resumption
/// window (see [`crate::subscriber`]).
pub const MAX_JITTER_SECS: i64 = 172_800;

/// Returns `now() - rand_uniform(0, 2*86400)`, used for the `created_at` of
/// seals and gift wraps (never for the rumor itself).
#[must_use]
pub fn jittered_now() -> i64 {
    let now = unix_now();
    let jitter = rand::thread_rng().gen_range(0..MAX_JITTER_SECS);
    now - jitter
}

/// Current unix time in seconds.
#[must_use]
pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jittered_now_is_within_window() {
        let now = unix_now();
        for _ in 0..50 {
            let j = jittered_now();
            assert!(j <= now);
            assert!(j >= now - MAX_JITTER_SECS - 1);
        }
    }
}
