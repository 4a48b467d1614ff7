//! Per-contact, per-key trust decisions.
//!
//! Every record is keyed by the contact *and* the exact key id. When a
//! contact rotates their keys the new key id has no record, so it reads as
//! [`VerificationStatus::Unverified`] until the user checks it again.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::KeyId;
use crate::error::{Error, Result};
use crate::storage::KeyValueStore;
use crate::time;

const VERIFICATION_PREFIX: &str = "verification";

/// Trust decision for one contact key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Not checked (the default)
    Unverified,
    /// Fingerprint confirmed out of band
    Verified,
    /// Fingerprint compared and did not match
    Mismatch,
}

impl VerificationStatus {
    /// Lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Unverified => "unverified",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Mismatch => "mismatch",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored form of a decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    /// The decision
    pub status: VerificationStatus,
    /// When it was made
    pub updated_at: DateTime<Utc>,
}

/// Trust decisions over a [`KeyValueStore`]
#[derive(Clone)]
pub struct VerificationStore {
    store: Arc<dyn KeyValueStore>,
}

impl VerificationStore {
    /// Wrap a key-value store
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn record_key(user_id: &str, key_id: &KeyId) -> String {
        format!("{}/{}/{}", VERIFICATION_PREFIX, user_id, key_id)
    }

    /// Record a decision for exactly `(user_id, key_id)`
    pub fn set_status(&self, user_id: &str, key_id: &KeyId, status: VerificationStatus) -> Result<()> {
        let record = VerificationRecord {
            status,
            updated_at: time::now(),
        };
        let json = serde_json::to_string(&record)?;
        self.store.put(&Self::record_key(user_id, key_id), &json)?;
        tracing::info!(user_id, key_id = %key_id, status = status.as_str(), "Updated verification status");
        Ok(())
    }

    /// Decision for `(user_id, key_id)`, `Unverified` if none
    ///
    /// An unreadable record also reads as `Unverified`: trust is never
    /// granted on data that cannot be parsed.
    pub fn get_status(&self, user_id: &str, key_id: &KeyId) -> Result<VerificationStatus> {
        Ok(self
            .record(user_id, key_id)?
            .map(|record| record.status)
            .unwrap_or(VerificationStatus::Unverified))
    }

    /// Full record for `(user_id, key_id)`
    pub fn record(&self, user_id: &str, key_id: &KeyId) -> Result<Option<VerificationRecord>> {
        let raw = match self.store.get(&Self::record_key(user_id, key_id))? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(_) => {
                tracing::warn!(user_id, key_id = %key_id, "Ignoring unreadable verification record");
                Ok(None)
            }
        }
    }

    /// Statuses for several keys of one contact
    pub fn records_for(
        &self,
        user_id: &str,
        key_ids: &[KeyId],
    ) -> Result<Vec<(KeyId, VerificationStatus)>> {
        key_ids
            .iter()
            .map(|key_id| Ok((key_id.clone(), self.get_status(user_id, key_id)?)))
            .collect()
    }

    /// Drop the records of several keys of one contact
    ///
    /// Returns how many existed.
    pub fn forget_user(&self, user_id: &str, key_ids: &[KeyId]) -> Result<usize> {
        let mut removed = 0;
        for key_id in key_ids {
            if self.store.delete(&Self::record_key(user_id, key_id))? {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(user_id, removed, "Forgot verification records");
        }
        Ok(removed)
    }
}

impl std::str::FromStr for VerificationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unverified" => Ok(VerificationStatus::Unverified),
            "verified" => Ok(VerificationStatus::Verified),
            "mismatch" => Ok(VerificationStatus::Mismatch),
            other => Err(Error::Internal(format!("unknown verification status '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store() -> (Arc<MemoryStore>, VerificationStore) {
        let memory = Arc::new(MemoryStore::new());
        (memory.clone(), VerificationStore::new(memory))
    }

    fn key(id: &str) -> KeyId {
        KeyId::parse(id).unwrap()
    }

    #[test]
    fn test_default_is_unverified() {
        let (_, store) = store();
        assert_eq!(
            store.get_status("bob", &key("k1")).unwrap(),
            VerificationStatus::Unverified
        );
        assert!(store.record("bob", &key("k1")).unwrap().is_none());
    }

    #[test]
    fn test_set_and_get() {
        let (_, store) = store();
        store
            .set_status("bob", &key("k1"), VerificationStatus::Verified)
            .unwrap();
        assert_eq!(
            store.get_status("bob", &key("k1")).unwrap(),
            VerificationStatus::Verified
        );

        store
            .set_status("bob", &key("k1"), VerificationStatus::Mismatch)
            .unwrap();
        assert_eq!(
            store.get_status("bob", &key("k1")).unwrap(),
            VerificationStatus::Mismatch
        );
    }

    #[test]
    fn test_rotation_resets_trust() {
        let (_, store) = store();
        store
            .set_status("bob", &key("keyA"), VerificationStatus::Verified)
            .unwrap();

        assert_eq!(
            store.get_status("bob", &key("keyB")).unwrap(),
            VerificationStatus::Unverified
        );
        assert_eq!(
            store.get_status("carol", &key("keyA")).unwrap(),
            VerificationStatus::Unverified
        );
    }

    #[test]
    fn test_record_wire_format() {
        let (memory, store) = store();
        store
            .set_status("bob", &key("k1"), VerificationStatus::Verified)
            .unwrap();

        let raw = memory.get("verification/bob/k1").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["status"], "verified");
        assert!(value["updatedAt"].is_string());
    }

    #[test]
    fn test_unreadable_record_is_unverified() {
        let (memory, store) = store();
        memory.put("verification/bob/k1", "{{{").unwrap();
        assert_eq!(
            store.get_status("bob", &key("k1")).unwrap(),
            VerificationStatus::Unverified
        );
    }

    #[test]
    fn test_records_for_and_forget() {
        let (_, store) = store();
        store
            .set_status("bob", &key("k1"), VerificationStatus::Verified)
            .unwrap();
        store
            .set_status("bob", &key("k2"), VerificationStatus::Mismatch)
            .unwrap();

        let keys = [key("k1"), key("k2"), key("k3")];
        let records = store.records_for("bob", &keys).unwrap();
        assert_eq!(
            records,
            vec![
                (key("k1"), VerificationStatus::Verified),
                (key("k2"), VerificationStatus::Mismatch),
                (key("k3"), VerificationStatus::Unverified),
            ]
        );

        assert_eq!(store.forget_user("bob", &keys).unwrap(), 2);
        assert_eq!(
            store.get_status("bob", &key("k1")).unwrap(),
            VerificationStatus::Unverified
        );
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Verified".parse::<VerificationStatus>().unwrap(), VerificationStatus::Verified);
        assert!("trusted".parse::<VerificationStatus>().is_err());
    }
}
