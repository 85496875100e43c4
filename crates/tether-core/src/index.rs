//! Thumbprint-keyed lookup tables.

use std::{collections::HashMap, sync::Arc};

use tether_crypto::{KeyMaterial, ThumbprintAlgorithm};

/// Map from thumbprint string to a shared value.
///
/// One value is usually registered under several thumbprints of the same
/// key, so values are stored behind an `Arc` and never copied. The index is
/// filled once and then only read; callers that need a different index build
/// a new one and swap it in whole.
#[derive(Debug)]
pub struct ThumbprintIndex<V> {
    entries: HashMap<String, Arc<V>>,
}

impl<V> Default for ThumbprintIndex<V> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<V> Clone for ThumbprintIndex<V> {
    fn clone(&self) -> Self {
        Self { entries: self.entries.clone() }
    }
}

impl<V> ThumbprintIndex<V> {
    /// Empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` under a single thumbprint, replacing any previous
    /// entry.
    pub fn insert(&mut self, thumbprint: impl Into<String>, value: V) {
        self.entries.insert(thumbprint.into(), Arc::new(value));
    }

    /// Register `value` under every thumbprint of `key`.
    ///
    /// Returns the thumbprints it was registered under, in `algorithms`
    /// order.
    pub fn insert_key(
        &mut self,
        key: &KeyMaterial,
        value: V,
        algorithms: &[ThumbprintAlgorithm],
    ) -> Vec<String> {
        let value = Arc::new(value);
        let thumbprints = key.thumbprints(algorithms);
        for thumbprint in &thumbprints {
            self.entries.insert(thumbprint.clone(), Arc::clone(&value));
        }
        thumbprints
    }

    /// Value registered under `thumbprint`.
    pub fn get(&self, thumbprint: &str) -> Option<&V> {
        self.entries.get(thumbprint).map(Arc::as_ref)
    }

    /// Whether `thumbprint` is registered.
    pub fn contains(&self, thumbprint: &str) -> bool {
        self.entries.contains_key(thumbprint)
    }

    /// Number of registered thumbprints.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered thumbprints, in no particular order.
    pub fn thumbprints(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
