//! # Key Backup
//!
//! Password-encrypted export and import of a key pair.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         BACKUP FORMAT (v1)                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  {                                                                      │
//! │    "version": 1,                                                       │
//! │    "salt": "base64 (16 bytes)",                                        │
//! │    "iv": "base64 (12 bytes)",                                          │
//! │    "ciphertext": "base64 (AES-256-GCM of the KeyPair JSON)",           │
//! │    "createdAt": "2026-10-15T12:00:00Z",                                │
//! │    "kdf": { "memoryKib": 19456, "iterations": 2, "parallelism": 1 }    │
//! │  }                                                                      │
//! │                                                                         │
//! │  key = Argon2id(password, salt, kdf)                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A wrong password and a damaged blob fail identically with
//! [`Error::BackupRestoreFailed`], so restore cannot be used as an oracle for
//! guessing passwords. Password strength is only checked when a backup is
//! created.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::config::{BackupPolicy, KdfParams};
use crate::crypto::{derive_backup_key, Iv, KeyPair, PlatformCrypto, SymmetricKey, SALT_SIZE};
use crate::error::{Error, Result};
use crate::time;

/// Current backup format version
pub const BACKUP_VERSION: u32 = 1;

/// An encrypted key pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupBlob {
    /// Format version
    pub version: u32,
    /// KDF salt (base64)
    pub salt: String,
    /// AES-GCM IV (base64)
    pub iv: String,
    /// Encrypted key pair (base64)
    pub ciphertext: String,
    /// When the backup was made
    pub created_at: DateTime<Utc>,
    /// KDF cost used for this blob
    pub kdf: KdfParams,
}

impl BackupBlob {
    /// Pretty JSON for a file download or copy-paste
    pub fn to_export_text(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Suggested file name for a download
    pub fn file_name(&self) -> String {
        format!("hush-key-backup-{}.json", self.created_at.format("%Y-%m-%d"))
    }

    /// Parse pasted or uploaded backup text
    ///
    /// Accepts the JSON export or base64 of it, with surrounding whitespace.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidBackupFormat("backup is empty".into()));
        }

        let json = if text.starts_with('{') {
            text.to_string()
        } else {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            let decoded = BASE64
                .decode(compact)
                .map_err(|_| Error::InvalidBackupFormat("neither JSON nor base64".into()))?;
            String::from_utf8(decoded)
                .map_err(|_| Error::InvalidBackupFormat("decoded backup is not text".into()))?
        };

        let blob: Self = serde_json::from_str(&json)
            .map_err(|e| Error::InvalidBackupFormat(format!("malformed backup: {}", e)))?;
        if blob.version != BACKUP_VERSION {
            return Err(Error::InvalidBackupFormat(format!(
                "unsupported backup version {}",
                blob.version
            )));
        }
        Ok(blob)
    }
}

/// Creates and restores password-encrypted key backups
#[derive(Clone)]
pub struct BackupVault {
    crypto: Arc<dyn PlatformCrypto>,
    policy: BackupPolicy,
}

impl BackupVault {
    /// Create a vault
    pub fn new(crypto: Arc<dyn PlatformCrypto>, policy: BackupPolicy) -> Self {
        Self { crypto, policy }
    }

    /// Encrypt `key_pair` under `password`
    pub async fn create(&self, key_pair: &KeyPair, password: &str) -> Result<BackupBlob> {
        check_password_strength(password, self.policy.min_password_length)?;

        let salt = self
            .crypto
            .random_bytes(SALT_SIZE)
            .await
            .map_err(create_failure)?;
        let key = derive_key(password, &salt, self.policy.kdf)
            .await
            .map_err(create_failure)?;
        let iv = self.crypto.generate_iv().await.map_err(create_failure)?;

        let plaintext = Zeroizing::new(serde_json::to_vec(key_pair).map_err(create_failure_from)?);
        let ciphertext = self
            .crypto
            .encrypt_symmetric(&key, &iv, &plaintext)
            .await
            .map_err(create_failure)?;

        tracing::info!(key_id = %key_pair.key_id(), "Created key backup");

        Ok(BackupBlob {
            version: BACKUP_VERSION,
            salt: BASE64.encode(salt),
            iv: BASE64.encode(iv.as_bytes()),
            ciphertext: BASE64.encode(ciphertext),
            created_at: time::now(),
            kdf: self.policy.kdf,
        })
    }

    /// Decrypt a backup
    ///
    /// Every failure is [`Error::BackupRestoreFailed`]. Run
    /// [`super::KeyPairManager::verify`] on the result before trusting it.
    pub async fn restore(&self, blob: &BackupBlob, password: &str) -> Result<KeyPair> {
        match self.try_restore(blob, password).await {
            Some(key_pair) => {
                tracing::info!(key_id = %key_pair.key_id(), "Restored key backup");
                Ok(key_pair)
            }
            None => {
                tracing::warn!("Key backup restore failed");
                Err(Error::BackupRestoreFailed)
            }
        }
    }

    /// Parse backup text, then [`Self::restore`] it
    pub async fn restore_text(&self, text: &str, password: &str) -> Result<KeyPair> {
        let blob = BackupBlob::parse(text)?;
        self.restore(&blob, password).await
    }

    async fn try_restore(&self, blob: &BackupBlob, password: &str) -> Option<KeyPair> {
        if blob.version != BACKUP_VERSION || !blob.kdf.within_limits() {
            return None;
        }

        let salt = BASE64.decode(blob.salt.trim()).ok()?;
        let iv = Iv::from_slice(&BASE64.decode(blob.iv.trim()).ok()?).ok()?;
        let ciphertext = BASE64.decode(blob.ciphertext.trim()).ok()?;

        let key = derive_key(password, &salt, blob.kdf).await.ok()?;
        let plaintext = Zeroizing::new(
            self.crypto
                .decrypt_symmetric(&key, &iv, &ciphertext)
                .await
                .ok()?,
        );
        serde_json::from_slice(&plaintext).ok()
    }
}

/// Reject passwords that are too short or one repeated character
pub fn check_password_strength(password: &str, min_length: usize) -> Result<()> {
    let length = password.chars().count();
    if length < min_length {
        return Err(Error::WeakBackupPassword(format!(
            "must be at least {} characters",
            min_length
        )));
    }
    let mut chars = password.chars();
    if let Some(first) = chars.next() {
        if chars.all(|c| c == first) {
            return Err(Error::WeakBackupPassword(
                "must not be a single repeated character".into(),
            ));
        }
    }
    Ok(())
}

/// Argon2 is slow on purpose; keep it off the async worker when possible.
async fn derive_key(password: &str, salt: &[u8], params: KdfParams) -> Result<SymmetricKey> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let password = Zeroizing::new(password.to_string());
            let salt = salt.to_vec();
            handle
                .spawn_blocking(move || derive_backup_key(&password, &salt, &params))
                .await
                .map_err(|e| Error::Internal(format!("key derivation task failed: {}", e)))?
        }
        Err(_) => derive_backup_key(password, salt, &params),
    }
}

fn create_failure(error: Error) -> Error {
    match error {
        Error::PlatformUnavailable(_) | Error::BackupCreateFailed(_) => error,
        other => Error::BackupCreateFailed(other.to_string()),
    }
}

fn create_failure_from(error: serde_json::Error) -> Error {
    Error::BackupCreateFailed(error.to_string())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fast_config, fixture_crypto, fixture_key_pair};

    fn vault() -> BackupVault {
        BackupVault::new(fixture_crypto(), fast_config().backup)
    }

    #[tokio::test]
    async fn test_backup_round_trip() {
        let vault = vault();
        let pair = fixture_key_pair();

        let blob = vault.create(&pair, "pw1-long-enough").await.unwrap();
        assert_eq!(blob.version, 1);
        assert_eq!(BASE64.decode(&blob.salt).unwrap().len(), SALT_SIZE);
        assert_eq!(BASE64.decode(&blob.iv).unwrap().len(), 12);

        let restored = vault.restore(&blob, "pw1-long-enough").await.unwrap();
        assert_eq!(restored.key_id(), pair.key_id());
        assert_eq!(restored.public_key(), pair.public_key());
        assert_eq!(restored.private_key(), pair.private_key());
        assert_eq!(restored, pair);
    }

    #[tokio::test]
    async fn test_wrong_password_fails() {
        let vault = vault();
        let blob = vault.create(&fixture_key_pair(), "pw1-long-enough").await.unwrap();

        let result = vault.restore(&blob, "wrong-pw-entirely").await;
        assert!(matches!(result, Err(Error::BackupRestoreFailed)));
    }

    #[tokio::test]
    async fn test_corruption_indistinguishable_from_wrong_password() {
        let vault = vault();
        let blob = vault.create(&fixture_key_pair(), "pw1-long-enough").await.unwrap();

        let mut tampered = blob.clone();
        let mut bytes = BASE64.decode(&tampered.ciphertext).unwrap();
        bytes[5] ^= 0x40;
        tampered.ciphertext = BASE64.encode(bytes);

        let mut bad_salt = blob.clone();
        bad_salt.salt = "%%%".into();

        let wrong_pw = vault.restore(&blob, "nope-nope-nope").await.unwrap_err();
        let corrupted = vault.restore(&tampered, "pw1-long-enough").await.unwrap_err();
        let undecodable = vault.restore(&bad_salt, "pw1-long-enough").await.unwrap_err();

        assert_eq!(wrong_pw.to_string(), corrupted.to_string());
        assert_eq!(wrong_pw.to_string(), undecodable.to_string());
        assert_eq!(wrong_pw.code(), corrupted.code());
    }

    #[tokio::test]
    async fn test_restore_rejects_excessive_kdf_cost() {
        let vault = vault();
        let blob = vault.create(&fixture_key_pair(), "pw1-long-enough").await.unwrap();

        let mut slow = blob.clone();
        slow.kdf.iterations = 4_000_000_000;
        let mut wide = blob.clone();
        wide.kdf.parallelism = 1 << 20;
        let mut huge = blob;
        huge.kdf.memory_kib = u32::MAX;

        for blob in [slow, wide, huge] {
            let result = vault.restore(&blob, "pw1-long-enough").await;
            assert!(matches!(result, Err(Error::BackupRestoreFailed)));
        }
    }

    #[tokio::test]
    async fn test_fresh_salt_and_iv_per_backup() {
        let vault = vault();
        let pair = fixture_key_pair();
        let a = vault.create(&pair, "pw1-long-enough").await.unwrap();
        let b = vault.create(&pair, "pw1-long-enough").await.unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[tokio::test]
    async fn test_weak_password_rejected_at_create_only() {
        let vault = vault();
        let pair = fixture_key_pair();

        assert!(matches!(
            vault.create(&pair, "short").await,
            Err(Error::WeakBackupPassword(_))
        ));
        assert!(matches!(
            vault.create(&pair, "aaaaaaaaaaaa").await,
            Err(Error::WeakBackupPassword(_))
        ));

        // Restore with a short password just fails to decrypt
        let blob = vault.create(&pair, "pw1-long-enough").await.unwrap();
        assert!(matches!(
            vault.restore(&blob, "x").await,
            Err(Error::BackupRestoreFailed)
        ));
    }

    #[tokio::test]
    async fn test_export_text_round_trip() {
        let vault = vault();
        let pair = fixture_key_pair();
        let blob = vault.create(&pair, "pw1-long-enough").await.unwrap();

        let text = blob.to_export_text().unwrap();
        assert!(text.contains("\"createdAt\""));
        assert_eq!(BackupBlob::parse(&format!("\n  {}  \n", text)).unwrap(), blob);

        let pasted = BASE64.encode(text.as_bytes());
        assert_eq!(BackupBlob::parse(&pasted).unwrap(), blob);

        let restored = vault.restore_text(&pasted, "pw1-long-enough").await.unwrap();
        assert_eq!(restored, pair);
        assert!(blob.file_name().starts_with("hush-key-backup-"));
    }

    #[test]
    fn test_parse_rejects_bad_text() {
        assert!(matches!(BackupBlob::parse("   "), Err(Error::InvalidBackupFormat(_))));
        assert!(matches!(
            BackupBlob::parse("not a backup!"),
            Err(Error::InvalidBackupFormat(_))
        ));
        assert!(matches!(
            BackupBlob::parse("{\"version\": 1}"),
            Err(Error::InvalidBackupFormat(_))
        ));

        let future = r#"{"version":2,"salt":"","iv":"","ciphertext":"","createdAt":"2026-01-01T00:00:00Z","kdf":{}}"#;
        assert!(matches!(BackupBlob::parse(future), Err(Error::InvalidBackupFormat(_))));
    }

    #[test]
    fn test_password_strength() {
        assert!(check_password_strength("correct horse", 8).is_ok());
        assert!(check_password_strength("1234567", 8).is_err());
        assert!(check_password_strength("zzzzzzzzzz", 8).is_err());
        assert!(check_password_strength("", 0).is_ok());
    }
}
