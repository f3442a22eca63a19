//! In-memory collection store.

use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::{CollectionStore, StoreError};

/// In-memory store, mostly for tests.
///
/// Uses a BTreeMap for deterministic key order.
#[derive(Debug, Default)]
pub struct InMemoryCollectionStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryCollectionStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Check whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CollectionStore for InMemoryCollectionStore {
    fn load(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.blobs
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.blobs.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.blobs.read().keys().cloned().collect())
    }
}
