//! Event and rumor data types shared by the envelope and rumor-schema layers.

use serde::{Deserialize, Serialize};

/// `kind = 13`, the sealed-event layer.
pub const KIND_SEAL: u16 = 13;
/// `kind = 1059`, the gift-wrap layer.
pub const KIND_GIFT_WRAP: u16 = 1059;

/// A signed Nostr-style event. Equality is by `id` only (§3 "Equality by id"),
/// not full structural equality — two `Event`s with the same id are the same
/// event even if, say, one has not yet had its `sig` populated in a
/// round-trip test fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// 64-character lowercase hex event id.
    pub id: String,
    /// 64-character lowercase hex author public key.
    pub pubkey: String,
    /// Unix seconds.
    pub created_at: i64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    /// 128-character lowercase hex Schnorr signature over `id`.
    pub sig: String,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Event {}

/// An unsigned, id-bearing event. Same fields as [`Event`] except `sig` is
/// absent; the `id` is computed from the same canonicalisation as a signed
/// event would use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rumor {
    pub id: String,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
}

impl PartialEq for Rumor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Rumor {}

impl Rumor {
    /// Returns the first value of the first tag named `name`, if any.
    #[must_use]
    pub fn tag_value(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.first().map(String::as_str) == Some(name))
            .and_then(|t| t.get(1))
            .map(String::as_str)
    }

    /// Returns all values of tags named `name`, in order.
    #[must_use]
    pub fn tag_values_all(&self, name: &str) -> Vec<&[String]> {
        self.tags
            .iter()
            .filter(|t| t.first().map(String::as_str) == Some(name))
            .map(|t| t.get(1..).unwrap_or(&[]))
            .collect()
    }
}
