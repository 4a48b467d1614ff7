//! Persistence of the local identity key pair.
//!
//! Records are parsed strictly. A record that fails to parse is moved aside
//! into quarantine instead of being patched up in place; an explicit
//! [`crate::identity::KeyPairManager::repair`] call can work on the
//! quarantined text later.

use std::sync::Arc;

use super::KeyValueStore;
use crate::crypto::KeyPair;
use crate::error::{Error, Result};

const KEYS_PREFIX: &str = "keys";
const QUARANTINE_PREFIX: &str = "quarantine/keys";

/// Stores one key pair per local user
#[derive(Clone)]
pub struct KeyStore {
    store: Arc<dyn KeyValueStore>,
}

impl KeyStore {
    /// Wrap a key-value store
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn record_key(user_id: &str) -> String {
        format!("{}/{}", KEYS_PREFIX, user_id)
    }

    fn quarantine_key(user_id: &str) -> String {
        format!("{}/{}", QUARANTINE_PREFIX, user_id)
    }

    /// Persist the user's key pair, replacing any previous one
    pub fn save(&self, user_id: &str, key_pair: &KeyPair) -> Result<()> {
        let json = serde_json::to_string(key_pair)?;
        self.store.put(&Self::record_key(user_id), &json)?;
        tracing::debug!(user_id, key_id = %key_pair.key_id(), "Saved key pair");
        Ok(())
    }

    /// Load the user's key pair
    ///
    /// Returns `Ok(None)` if nothing is stored. A malformed record is moved
    /// to quarantine and reported as [`Error::StorageCorrupted`].
    pub fn load(&self, user_id: &str) -> Result<Option<KeyPair>> {
        let key = Self::record_key(user_id);
        let raw = match self.store.get(&key)? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        match serde_json::from_str::<KeyPair>(&raw) {
            Ok(pair) => Ok(Some(pair)),
            Err(_) => {
                self.store.put(&Self::quarantine_key(user_id), &raw)?;
                self.store.delete(&key)?;
                tracing::warn!(user_id, "Quarantined malformed key pair record");
                Err(Error::StorageCorrupted(format!("key pair for {}", user_id)))
            }
        }
    }

    /// Raw text of a quarantined record, if any
    pub fn quarantined(&self, user_id: &str) -> Result<Option<String>> {
        self.store.get(&Self::quarantine_key(user_id))
    }

    /// Drop a quarantined record once it has been repaired or replaced
    pub fn clear_quarantine(&self, user_id: &str) -> Result<bool> {
        self.store.delete(&Self::quarantine_key(user_id))
    }

    /// Remove the user's key pair
    pub fn delete(&self, user_id: &str) -> Result<bool> {
        self.store.delete(&Self::record_key(user_id))
    }
}
