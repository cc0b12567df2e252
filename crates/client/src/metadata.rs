//! MetadataManager - thread-safe global metadata map

use std::sync::{PoisonError, RwLock};

use contracts::FieldMap;
use serde_json::Value;

/// Thread-safe mapping from metadata key to value.
///
/// `snapshot` returns a coherent point-in-time shallow copy; readers never
/// observe a torn state and interior references never escape.
#[derive(Debug, Default)]
pub struct MetadataManager {
    entries: RwLock<FieldMap>,
}

impl MetadataManager {
    /// Empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an entry.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value);
    }

    /// Current value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Coherent copy of all current entries.
    pub fn snapshot(&self) -> FieldMap {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
