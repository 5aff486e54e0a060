//! Inverted identifier index
//!
//! Maps `kind:value` to every identity asserting it, in insertion order.
//! Exact resolution and link discovery are single hash lookups against it.

use ahash::AHashMap;

use crate::identity::IdentifierKind;

/// `kind:value` -> ordered set of identity ids
#[derive(Debug, Clone, Default)]
pub struct IdentifierIndex {
    entries: AHashMap<String, Vec<String>>,
}

impl IdentifierIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `identity_id` asserts `kind:value`.
    ///
    /// Returns `false` if the pair was already indexed for this id.
    pub fn insert(&mut self, kind: IdentifierKind, value: &str, identity_id: &str) -> bool {
        let ids = self.entries.entry(kind.key(value)).or_default();
        if ids.iter().any(|id| id == identity_id) {
            return false;
        }
        ids.push(identity_id.to_string());
        true
    }

    /// Ids asserting `kind:value`, first inserted first. Empty if unknown.
    pub fn lookup(&self, kind: IdentifierKind, value: &str) -> &[String] {
        self.lookup_key(&kind.key(value))
    }

    /// Lookup by a preformatted `kind:value` key
    pub fn lookup_key(&self, key: &str) -> &[String] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, kind: IdentifierKind, value: &str, identity_id: &str) -> bool {
        self.lookup(kind, value).iter().any(|id| id == identity_id)
    }

    /// Number of distinct `kind:value` keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All keys with their ids, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
