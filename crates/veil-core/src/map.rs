//! The plaintext original-value map.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::category::PiiCategory;

/// Builds the canonical `"{CATEGORY}_{id}"` map key.
#[must_use]
pub fn map_key(category: PiiCategory, id: u32) -> String {
    format!("{}_{id}", category.as_str())
}

/// Mapping from `"{CATEGORY}_{id}"` keys to original text values.
///
/// Built by the tagger and consumed by the rehydrator; holds recovered PII
/// in the clear. Debug output redacts the values and the stored values are
/// zeroized on drop. The map must be encrypted by the vault before leaving
/// the pipeline and is never logged or serialized in the clear outside that
/// path.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaintextMap {
    entries: BTreeMap<String, String>,
}

impl PlaintextMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the original value for a category/id pair.
    pub fn insert(&mut self, category: PiiCategory, id: u32, value: impl Into<String>) {
        self.entries.insert(map_key(category, id), value.into());
    }

    /// Looks up a value by its raw key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Looks up a value by category and id.
    #[must_use]
    pub fn lookup(&self, category: PiiCategory, id: u32) -> Option<&str> {
        self.get(&map_key(category, id))
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates over the keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for PlaintextMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlaintextMap([REDACTED, {} entries])", self.entries.len())
    }
}

impl Drop for PlaintextMap {
    fn drop(&mut self) {
        for value in self.entries.values_mut() {
            value.zeroize();
        }
    }
}
