//! `make_rumor`: the first step of the envelope chain (§4.B).

use crate::crypto::{event_id, Keypair};

use super::model::Rumor;

/// Caller-supplied fields for a new rumor. `kind` is always required; the
/// rest default per §4.B (`created_at = now()`, `tags = []`, `content = ""`).
#[derive(Debug, Clone, Default)]
pub struct RumorPartial {
    pub kind: u16,
    pub created_at: Option<i64>,
    pub tags: Option<Vec<Vec<String>>>,
    pub content: Option<String>,
}

impl RumorPartial {
    /// Starts a partial rumor of the given kind with all other fields defaulted.
    #[must_use]
    pub fn new(kind: u16) -> Self {
        Self { kind, ..Self::default() }
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Vec<Vec<String>>) -> Self {
        self.tags = Some(tags);
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub const fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Builds a rumor: fills `pubkey` from `author_sk`, defaults `created_at`,
/// `tags`, and `content`, computes `id`. Never signs — a rumor is, by
/// definition, unsigned.
#[must_use]
pub fn make_rumor(partial: RumorPartial, author_sk: &Keypair) -> Rumor {
    let pubkey = author_sk.pubkey_hex();
    let created_at = partial.created_at.unwrap_or_else(crate::crypto::unix_now);
    let tags = partial.tags.unwrap_or_default();
    let content = partial.content.unwrap_or_default();
    let id = hex::encode(event_id(&pubkey, created_at, partial.kind, &tags, &content));
    Rumor { id, pubkey, created_at, kind: partial.kind, tags, content }
}
