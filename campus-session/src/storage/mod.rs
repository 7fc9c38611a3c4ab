//! Storage tier abstraction
//!
//! Two key-value stores with different lifetimes back the session state:
//! an ephemeral tier that ends with the browser session (tokens, serialized
//! identity payloads, academic display names) and a durable tier that
//! survives restarts (organization fields, last-activity timestamp).
//!
//! Tiers are injectable ports so tests substitute in-memory fakes. Tiers
//! never serialize non-string values; callers JSON-encode at the boundary
//! and re-sanitize everything they read back.

pub mod keys;
pub mod memory;

pub use keys::{StorageKey, TierKind};
pub use memory::MemoryTier;

use crate::sanitize::sanitize_scalar;
use std::sync::Arc;

/// A single key-value store with one lifetime
///
/// Implementations hold plain strings and perform no serialization.
pub trait StorageTier: Send + Sync {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    fn clear(&self);
}

/// The two tiers bundled together, with key-to-tier routing enforced
#[derive(Clone)]
pub struct SessionStores {
    ephemeral: Arc<dyn StorageTier>,
    durable: Arc<dyn StorageTier>,
}

impl SessionStores {
    pub fn new(ephemeral: Arc<dyn StorageTier>, durable: Arc<dyn StorageTier>) -> Self {
        Self { ephemeral, durable }
    }

    /// In-memory tiers for both lifetimes; the default for tests
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTier::new()), Arc::new(MemoryTier::new()))
    }

    fn tier(&self, kind: TierKind) -> &dyn StorageTier {
        match kind {
            TierKind::Ephemeral => self.ephemeral.as_ref(),
            TierKind::Durable => self.durable.as_ref(),
        }
    }

    /// Raw read; callers that feed the value into state should prefer
    /// [`SessionStores::read_sanitized`]
    pub fn read(&self, key: StorageKey) -> Option<String> {
        self.tier(key.tier()).read(key.as_str())
    }

    /// Read with the scalar sanitizer applied, for values re-entering state
    pub fn read_sanitized(&self, key: StorageKey) -> Option<String> {
        self.read(key).map(|value| sanitize_scalar(&value))
    }

    pub fn write(&self, key: StorageKey, value: &str) {
        self.tier(key.tier()).write(key.as_str(), value);
    }

    pub fn remove(&self, key: StorageKey) {
        self.tier(key.tier()).remove(key.as_str());
    }

    /// Wipe one tier entirely
    pub fn clear_tier(&self, kind: TierKind) {
        self.tier(kind).clear();
    }

    /// Wipe both tiers
    pub fn clear_all(&self) {
        self.ephemeral.clear();
        self.durable.clear();
    }
}
