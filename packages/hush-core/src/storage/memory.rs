//! In-memory [`KeyValueStore`].

use std::collections::HashMap;

use parking_lot::RwLock;

use super::KeyValueStore;
use crate::error::Result;

/// Process-local store, used by tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    memory: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.memory.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.memory.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let storage = self.memory.read();
        Ok(storage.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut storage = self.memory.write();
        storage.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut storage = self.memory.write();
        Ok(storage.remove(key).is_some())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        let storage = self.memory.read();
        Ok(storage.contains_key(key))
    }
}
