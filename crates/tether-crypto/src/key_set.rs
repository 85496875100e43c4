//! Ordered, duplicate-free JWK sets.

use serde::{Deserialize, Serialize};

use crate::{error::KeyError, key::KeyMaterial};

/// A JWK Set: `{"keys":[...]}`.
///
/// Keys keep their insertion order so serialization is deterministic; adding
/// a key equal to one already present is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "KeySetWire")]
pub struct KeySet {
    keys: Vec<KeyMaterial>,
}

#[derive(Deserialize)]
struct KeySetWire {
    keys: Vec<KeyMaterial>,
}

impl From<KeySetWire> for KeySet {
    fn from(wire: KeySetWire) -> Self {
        wire.keys.into_iter().collect()
    }
}

impl KeySet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key` unless an equal key is already present. Returns whether it
    /// was added.
    pub fn insert(&mut self, key: KeyMaterial) -> bool {
        if self.keys.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    /// Whether an equal key is present.
    pub fn contains(&self, key: &KeyMaterial) -> bool {
        self.keys.contains(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> &[KeyMaterial] {
        &self.keys
    }

    /// Iterate keys in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, KeyMaterial> {
        self.keys.iter()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set has no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// A new set holding the public half of every key.
    ///
    /// Two private keys sharing a public point collapse into one entry.
    pub fn public(&self) -> Self {
        self.keys.iter().map(KeyMaterial::public).collect()
    }

    /// Whether any key carries a private scalar.
    pub fn has_private(&self) -> bool {
        self.keys.iter().any(KeyMaterial::is_private)
    }

    /// Parse a JWK Set document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, KeyError> {
        serde_json::from_slice(bytes)
            .map_err(|err| KeyError::invalid(format!("not a JWK set: {err}")))
    }

    /// Serialize as a JWK Set document.
    pub fn to_json(&self) -> Result<Vec<u8>, KeyError> {
        serde_json::to_vec(self)
            .map_err(|err| KeyError::invalid(format!("JWK set serialization: {err}")))
    }
}

impl FromIterator<KeyMaterial> for KeySet {
    fn from_iter<I: IntoIterator<Item = KeyMaterial>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<KeyMaterial> for KeySet {
    fn extend<I: IntoIterator<Item = KeyMaterial>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<'a> IntoIterator for &'a KeySet {
    type Item = &'a KeyMaterial;
    type IntoIter = std::slice::Iter<'a, KeyMaterial>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

impl IntoIterator for KeySet {
    type Item = KeyMaterial;
    type IntoIter = std::vec::IntoIter<KeyMaterial>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter()
    }
}
