//! In-memory storage tier
//!
//! Backs both tiers in tests and in embeddings without real browser
//! storage.

use super::StorageTier;
use std::collections::HashMap;
use std::sync::RwLock;

/// Simple in-memory key-value tier
#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().expect("memory tier lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageTier for MemoryTier {
    fn read(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .expect("memory tier lock poisoned")
            .get(key)
            .cloned()
    }

    fn write(&self, key: &str, value: &str) {
        self.entries
            .write()
            .expect("memory tier lock poisoned")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries
            .write()
            .expect("memory tier lock poisoned")
            .remove(key);
    }

    fn clear(&self) {
        self.entries
            .write()
            .expect("memory tier lock poisoned")
            .clear();
    }
}
