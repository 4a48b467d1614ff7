//! # Storage Module
//!
//! Local persistence for key pairs and trust decisions.
//!
//! ## Storage Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         STORAGE SYSTEM                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  KeyValueStore (host capability)                                │   │
//! │  │  ───────────────────────────────                                 │   │
//! │  │                                                                 │   │
//! │  │  • get(key)          - Read one whole value                    │   │
//! │  │  • put(key, value)   - Replace one whole value                 │   │
//! │  │  • delete(key)       - Remove a value                          │   │
//! │  │                                                                 │   │
//! │  │  Browser: localStorage / IndexedDB                             │   │
//! │  │  CLI: one file per key, written via temp + rename             │   │
//! │  │  Tests: MemoryStore                                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                              │                                          │
//! │                              ▼                                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Key layout                                                     │   │
//! │  │  ──────────                                                      │   │
//! │  │                                                                 │   │
//! │  │  keys/{userId}                     → KeyPair JSON              │   │
//! │  │  quarantine/keys/{userId}          → malformed KeyPair text    │   │
//! │  │  verification/{userId}/{keyId}     → { status, updatedAt }     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every write replaces a whole value, so a reader never observes a
//! half-written record.

mod key_store;
mod memory;

pub use key_store::KeyStore;
pub use memory::MemoryStore;

use crate::error::Result;

/// A string-keyed store of whole text values
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Atomically replace a value
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Returns whether it existed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Check if a key exists
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}
