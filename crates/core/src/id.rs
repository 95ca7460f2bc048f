//! Deterministic note identifiers.
//!
//! Unlike a random or timestamp-seeded id, a [`NoteId`] is a pure function
//! of a note's own content: title, body, category and sorted tags hash to
//! the same sixteen hex characters every time. Re-parsing an unchanged file
//! must always recover the same id (see the content-hash invariant in
//! `SPEC_FULL.md` §3), so nothing here may read the clock or touch
//! randomness.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

const ID_PREFIX: &str = "note_";
const HASH_LEN: usize = 16;

/// A stable, content-derived identifier for a note.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Derive an id from a note's identity-bearing fields.
    ///
    /// Tags are sorted before hashing so that `tags: [b, a]` and
    /// `tags: [a, b]` produce the same id — tag order is not part of a
    /// note's identity.
    pub fn from_content(title: &str, body: &str, category: &str, tags: &[String]) -> Self {
        let mut sorted_tags = tags.to_vec();
        sorted_tags.sort();

        let mut hasher = Sha256::new();
        hasher.update(title.as_bytes());
        hasher.update(b"|");
        hasher.update(body.as_bytes());
        hasher.update(b"|");
        hasher.update(category.as_bytes());
        hasher.update(b"|");
        hasher.update(format!("{sorted_tags:?}").as_bytes());
        let digest = hasher.finalize();
        let hex = hex::encode(digest);

        NoteId(format!("{ID_PREFIX}{}", &hex[..HASH_LEN]))
    }

    /// Parse an existing id string, e.g. one read back out of front-matter.
    pub fn parse(raw: &str) -> Option<Self> {
        let stripped = raw.strip_prefix(ID_PREFIX)?;
        if stripped.len() == HASH_LEN && stripped.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(NoteId(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NoteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<NoteId> for String {
    fn from(id: NoteId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_content_same_id() {
        let a = NoteId::from_content("Title", "body text", "Research", &["b".into(), "a".into()]);
        let b = NoteId::from_content("Title", "body text", "Research", &["a".into(), "b".into()]);
        assert_eq!(a, b, "tag order must not affect the id");
    }

    #[test]
    fn different_body_different_id() {
        let a = NoteId::from_content("Title", "body one", "Research", &[]);
        let b = NoteId::from_content("Title", "body two", "Research", &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn id_has_expected_shape() {
        let id = NoteId::from_content("Title", "body", "Quick Notes", &[]);
        assert!(id.as_str().starts_with("note_"));
        assert_eq!(id.as_str().len(), "note_".len() + HASH_LEN);
    }

    #[test]
    fn parse_roundtrip() {
        let id = NoteId::from_content("Title", "body", "Quick Notes", &[]);
        let parsed = NoteId::parse(id.as_str()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(NoteId::parse("not-an-id").is_none());
        assert!(NoteId::parse("note_tooshort").is_none());
    }
}
