//! # Session
//!
//! The explicit per-user context that ties the components together.
//!
//! ## Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SESSION LIFECYCLE                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. Login                                                              │
//! │     ┌─────────────┐                                                    │
//! │     │ Session::   │──► Validate config                                 │
//! │     │ login()     │──► Load key pair from the key store (if any)       │
//! │     └─────────────┘──► Quarantine a malformed record                   │
//! │            │                                                           │
//! │            ▼                                                           │
//! │  2. Keys                                                               │
//! │     ┌─────────────┐                                                    │
//! │     │ rotate_     │──► Generate ──► Verify ──► Publish ──► Persist     │
//! │     │ keys()      │    (local state changes only after publish)        │
//! │     └─────────────┘                                                    │
//! │            │                                                           │
//! │            ▼                                                           │
//! │  3. Messaging                                                          │
//! │     ┌─────────────┐                                                    │
//! │     │  Active     │◄─► send_message / open_message / open_batch        │
//! │     │  State      │◄─► fingerprints and verification                   │
//! │     └─────────────┘◄─► backup / restore                                │
//! │            │                                                           │
//! │            ▼                                                           │
//! │  4. Logout                                                             │
//! │     ┌─────────────┐                                                    │
//! │     │ logout()    │──► Drops the session and its key material          │
//! │     └─────────────┘                                                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! If the host has no usable crypto, the first operation that finds out
//! switches private messaging off for the rest of the session. Every later
//! call fails with [`Error::MessagingDisabled`]; nothing falls back to weaker
//! cryptography.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::RwLock;

use crate::config::HushConfig;
use crate::crypto::{KeyPair, PlatformCrypto, PublicKeyInfo};
use crate::error::{Error, Result};
use crate::identity::{
    BackupBlob, BackupVault, Fingerprint, FingerprintService, KeyPairManager, RotationStatus,
    VerificationStatus, VerificationStore,
};
use crate::messaging::{DecryptedMessage, HybridCipher, ImageCodec, MessagePackage, OutboundMessage};
use crate::storage::{KeyStore, KeyValueStore};

// ============================================================================
// COLLABORATORS
// ============================================================================

/// The public-key directory service
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Publish a user's current public key
    async fn publish(&self, user_id: &str, key: &PublicKeyInfo) -> Result<()>;

    /// Current public key of a user
    async fn lookup(&self, user_id: &str) -> Result<Option<PublicKeyInfo>>;
}

/// The message transport
///
/// Receives opaque packages; never decrypts them.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Hand a message over for delivery
    async fn send(&self, message: &OutboundMessage) -> Result<()>;
}

/// A [`KeyDirectory`] kept in a local [`KeyValueStore`] under
/// `directory/{userId}`
///
/// Serves single-device setups and tests where every user shares one store.
pub struct LocalDirectory {
    store: Arc<dyn KeyValueStore>,
}

impl LocalDirectory {
    /// Wrap a store
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn entry_key(user_id: &str) -> String {
        format!("directory/{}", user_id)
    }
}

#[async_trait]
impl KeyDirectory for LocalDirectory {
    async fn publish(&self, user_id: &str, key: &PublicKeyInfo) -> Result<()> {
        let json = serde_json::to_string(key)?;
        self.store
            .put(&Self::entry_key(user_id), &json)
            .map_err(|e| Error::DirectoryError(e.to_string()))
    }

    async fn lookup(&self, user_id: &str) -> Result<Option<PublicKeyInfo>> {
        let raw = self
            .store
            .get(&Self::entry_key(user_id))
            .map_err(|e| Error::DirectoryError(e.to_string()))?;
        match raw {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| Error::DirectoryError(format!("malformed entry: {}", e))),
            None => Ok(None),
        }
    }
}

/// Everything a session needs from its host
#[derive(Clone)]
pub struct SessionDeps {
    /// Platform crypto
    pub crypto: Arc<dyn PlatformCrypto>,
    /// Local persistence
    pub store: Arc<dyn KeyValueStore>,
    /// Public-key directory
    pub directory: Arc<dyn KeyDirectory>,
    /// Message transport
    pub transport: Arc<dyn MessageTransport>,
    /// Image codec for downscaling, if the host has one
    pub image_codec: Option<Arc<dyn ImageCodec>>,
}

// ============================================================================
// SESSION
// ============================================================================

/// A logged-in user's private messaging context
///
/// Safe to share behind an `Arc`: operations take `&self` and never hold a
/// lock across an await point.
pub struct Session {
    user_id: String,
    config: HushConfig,
    key_pair: RwLock<Option<KeyPair>>,
    disabled: RwLock<Option<String>>,
    manager: KeyPairManager,
    cipher: HybridCipher,
    fingerprints: FingerprintService,
    verification: VerificationStore,
    vault: BackupVault,
    key_store: KeyStore,
    directory: Arc<dyn KeyDirectory>,
    transport: Arc<dyn MessageTransport>,
}

impl Session {
    /// Start a session for `user_id`, loading any stored key pair
    ///
    /// A malformed stored record is quarantined and the session starts
    /// without keys; see [`Self::repair_stored_keys`].
    pub fn login(user_id: impl Into<String>, deps: SessionDeps, config: HushConfig) -> Result<Self> {
        let user_id = user_id.into();
        config.validate()?;

        let key_store = KeyStore::new(deps.store.clone());
        let key_pair = match key_store.load(&user_id) {
            Ok(pair) => pair,
            Err(Error::StorageCorrupted(_)) => None,
            Err(e) => return Err(e),
        };

        tracing::info!(
            user_id = %user_id,
            has_keys = key_pair.is_some(),
            "Session started"
        );

        Ok(Self {
            manager: KeyPairManager::new(deps.crypto.clone()).with_modulus_bits(config.modulus_bits),
            cipher: HybridCipher::new(deps.crypto.clone())
                .with_images(config.image, deps.image_codec.clone()),
            fingerprints: FingerprintService::new(deps.crypto.clone()),
            verification: VerificationStore::new(deps.store.clone()),
            vault: BackupVault::new(deps.crypto, config.backup),
            key_store,
            directory: deps.directory,
            transport: deps.transport,
            key_pair: RwLock::new(key_pair),
            disabled: RwLock::new(None),
            user_id,
            config,
        })
    }

    /// End the session
    pub fn logout(self) {
        tracing::info!(user_id = %self.user_id, "Session ended");
    }

    /// The logged-in user
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Active configuration
    pub fn config(&self) -> &HushConfig {
        &self.config
    }

    /// The current key pair, if any
    pub fn key_pair(&self) -> Option<KeyPair> {
        self.key_pair.read().clone()
    }

    /// Whether private messaging is still available
    pub fn is_messaging_enabled(&self) -> bool {
        self.disabled.read().is_none()
    }

    fn ensure_enabled(&self) -> Result<()> {
        match self.disabled.read().as_ref() {
            Some(reason) => Err(Error::MessagingDisabled(reason.clone())),
            None => Ok(()),
        }
    }

    fn current_key_pair(&self) -> Result<KeyPair> {
        self.ensure_enabled()?;
        self.key_pair.read().clone().ok_or(Error::NoKeyPair)
    }

    /// Switch messaging off if `error` shows the platform cannot do crypto
    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            if error.is_fatal_for_messaging() {
                tracing::error!(
                    user_id = %self.user_id,
                    code = error.code(),
                    "Platform crypto unavailable, disabling private messaging"
                );
                *self.disabled.write() = Some("platform cryptography is unavailable".into());
            }
        }
        result
    }

    fn install(&self, key_pair: KeyPair) -> Result<KeyPair> {
        self.key_store.save(&self.user_id, &key_pair)?;
        *self.key_pair.write() = Some(key_pair.clone());
        Ok(key_pair)
    }

    /// Publish `key_pair`, then persist it
    ///
    /// If persisting fails after the directory accepted the new key, the
    /// previous public key is published again so contacts do not encrypt to
    /// a key whose private half was lost.
    async fn publish_and_install(&self, key_pair: KeyPair) -> Result<KeyPair> {
        let previous = self.key_pair.read().clone();
        self.directory
            .publish(&self.user_id, &key_pair.public_info())
            .await?;

        match self.install(key_pair.clone()) {
            Ok(installed) => Ok(installed),
            Err(error) => {
                tracing::error!(
                    user_id = %self.user_id,
                    key_id = %key_pair.key_id(),
                    "Published key pair could not be persisted"
                );
                if let Some(previous) = previous {
                    if let Err(rollback) = self
                        .directory
                        .publish(&self.user_id, &previous.public_info())
                        .await
                    {
                        tracing::error!(
                            user_id = %self.user_id,
                            code = rollback.code(),
                            "Could not restore the previous directory entry"
                        );
                    }
                }
                Err(error)
            }
        }
    }

    // ========================================================================
    // KEYS
    // ========================================================================

    /// Generate, verify, publish and persist a new key pair
    ///
    /// Local state only changes once the directory has accepted the new
    /// public key. If the key store then fails, the previous public key is
    /// republished and the error returned.
    pub async fn rotate_keys(&self, rotation_interval_days: u32) -> Result<KeyPair> {
        self.ensure_enabled()?;
        let previous = self.key_pair.read().as_ref().map(|pair| pair.key_id().clone());

        let key_pair = self
            .observe(self.manager.generate(rotation_interval_days).await)?;
        self.observe(self.manager.verify(&key_pair).await)?;
        let key_pair = self.publish_and_install(key_pair).await?;

        tracing::info!(
            user_id = %self.user_id,
            old_key_id = previous.as_ref().map(|id| id.as_str()).unwrap_or("none"),
            new_key_id = %key_pair.key_id(),
            "Rotated key pair"
        );
        Ok(key_pair)
    }

    /// Rotation status of the current key pair
    pub fn rotation_status(&self) -> Result<RotationStatus> {
        let key_pair = self.current_key_pair()?;
        Ok(KeyPairManager::check_rotation_status(
            &key_pair,
            self.config.warning_window_days,
        ))
    }

    /// Self-test the current key pair
    pub async fn verify_keys(&self) -> Result<()> {
        let key_pair = self.current_key_pair()?;
        self.observe(self.manager.verify(&key_pair).await)
    }

    /// Try to recover the quarantined key record
    pub async fn repair_stored_keys(&self) -> Result<KeyPair> {
        self.ensure_enabled()?;
        let raw = self
            .key_store
            .quarantined(&self.user_id)?
            .ok_or(Error::KeyRepairFailed)?;
        let key_pair = self.manager.repair(&raw).await?;
        let key_pair = self.install(key_pair)?;
        self.key_store.clear_quarantine(&self.user_id)?;
        Ok(key_pair)
    }

    // ========================================================================
    // MESSAGING
    // ========================================================================

    /// Encrypt and hand a message to the transport
    pub async fn send_message(
        &self,
        recipient_id: &str,
        content: &str,
        image: Option<&str>,
        expires_in_minutes: Option<u32>,
    ) -> Result<OutboundMessage> {
        let own = self.current_key_pair()?;
        let recipient = self.recipient_key(recipient_id).await?;

        let package = self.observe(
            self.cipher
                .prepare_message_package(content, &recipient.public_key, image, expires_in_minutes)
                .await,
        )?;
        let outbound = package.into_outbound(recipient_id, own.key_id().clone());
        self.transport.send(&outbound).await?;

        tracing::debug!(
            recipient_id,
            has_image = outbound.encrypted_image_data.is_some(),
            "Sent encrypted message"
        );
        Ok(outbound)
    }

    /// Decrypt a received package with our private key
    pub async fn open_message(&self, package: &MessagePackage) -> Result<DecryptedMessage> {
        let own = self.current_key_pair()?;
        self.observe(self.cipher.decrypt_package(package, own.private_key()).await)
    }

    /// Decrypt a batch of packages independently, in input order
    pub async fn open_batch(&self, packages: &[MessagePackage]) -> Result<Vec<Result<DecryptedMessage>>> {
        let own = self.current_key_pair()?;
        let results = join_all(
            packages
                .iter()
                .map(|package| self.cipher.decrypt_package(package, own.private_key())),
        )
        .await;
        Ok(results.into_iter().map(|r| self.observe(r)).collect())
    }

    async fn recipient_key(&self, recipient_id: &str) -> Result<PublicKeyInfo> {
        let info = self
            .directory
            .lookup(recipient_id)
            .await?
            .ok_or_else(|| Error::RecipientKeyNotFound(recipient_id.to_string()))?;
        if info.expires_at <= crate::time::now() {
            tracing::warn!(recipient_id, key_id = %info.key_id, "Recipient key is past its rotation date");
        }
        Ok(info)
    }

    // ========================================================================
    // FINGERPRINTS & VERIFICATION
    // ========================================================================

    /// Our own fingerprint
    pub async fn own_fingerprint(&self) -> Result<Fingerprint> {
        let own = self.current_key_pair()?;
        self.observe(self.fingerprints.derive(own.public_key()).await)
    }

    /// A contact's current key and its fingerprint
    pub async fn contact_fingerprint(&self, contact_id: &str) -> Result<(PublicKeyInfo, Fingerprint)> {
        self.ensure_enabled()?;
        let info = self.recipient_key(contact_id).await?;
        let fingerprint = self.observe(self.fingerprints.derive(&info.public_key).await)?;
        Ok((info, fingerprint))
    }

    /// Record that the user confirmed the contact's current key
    pub async fn mark_contact_verified(&self, contact_id: &str) -> Result<()> {
        self.ensure_enabled()?;
        let info = self.recipient_key(contact_id).await?;
        self.verification
            .set_status(contact_id, &info.key_id, VerificationStatus::Verified)
    }

    /// Compare a fingerprint read out by the contact with their current key
    ///
    /// Records `Verified` on a match and `Mismatch` otherwise. Malformed
    /// input is a mismatch.
    pub async fn compare_contact_fingerprint(
        &self,
        contact_id: &str,
        entered: &str,
    ) -> Result<VerificationStatus> {
        let (info, fingerprint) = self.contact_fingerprint(contact_id).await?;
        let status = if fingerprint.matches(entered) {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Mismatch
        };
        self.verification.set_status(contact_id, &info.key_id, status)?;
        Ok(status)
    }

    /// Trust status of the contact's current key
    pub async fn contact_status(&self, contact_id: &str) -> Result<VerificationStatus> {
        let info = self.recipient_key(contact_id).await?;
        self.verification.get_status(contact_id, &info.key_id)
    }

    // ========================================================================
    // BACKUP
    // ========================================================================

    /// Encrypt the current key pair under `password`
    pub async fn create_backup(&self, password: &str) -> Result<BackupBlob> {
        let own = self.current_key_pair()?;
        self.observe(self.vault.create(&own, password).await)
    }

    /// Restore a key pair from backup text, verify it, publish and persist it
    pub async fn restore_backup(&self, text: &str, password: &str) -> Result<KeyPair> {
        self.ensure_enabled()?;
        let key_pair = self.vault.restore_text(text, password).await?;
        self.observe(self.manager.verify(&key_pair).await)?;
        let key_pair = self.publish_and_install(key_pair).await?;
        tracing::info!(user_id = %self.user_id, key_id = %key_pair.key_id(), "Installed restored key pair");
        Ok(key_pair)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::storage::MemoryStore;
    use crate::test_support::{
        fast_config, fixture_crypto, fixture_key_pair, RecordingTransport, UnavailableCrypto,
    };

    struct Harness {
        crypto: Arc<dyn PlatformCrypto>,
        store: Arc<MemoryStore>,
        directory: Arc<LocalDirectory>,
        transport: Arc<RecordingTransport>,
    }

    impl Harness {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            Self {
                crypto: fixture_crypto(),
                directory: Arc::new(LocalDirectory::new(store.clone())),
                transport: Arc::new(RecordingTransport::default()),
                store,
            }
        }

        fn deps(&self, crypto: Arc<dyn PlatformCrypto>) -> SessionDeps {
            SessionDeps {
                crypto,
                store: self.store.clone(),
                directory: self.directory.clone(),
                transport: self.transport.clone(),
                image_codec: None,
            }
        }

        fn login(&self, user: &str) -> Session {
            Session::login(user, self.deps(self.crypto.clone()), fast_config()).unwrap()
        }
    }

    /// Memory store whose key records can be made read-only
    struct LockableStore {
        inner: MemoryStore,
        keys_locked: AtomicBool,
    }

    impl LockableStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                keys_locked: AtomicBool::new(false),
            }
        }
    }

    impl KeyValueStore for LockableStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn put(&self, key: &str, value: &str) -> Result<()> {
            if key.starts_with("keys/") && self.keys_locked.load(Ordering::SeqCst) {
                return Err(Error::StorageWriteError("disk full".into()));
            }
            self.inner.put(key, value)
        }

        fn delete(&self, key: &str) -> Result<bool> {
            self.inner.delete(key)
        }
    }

    #[tokio::test]
    async fn test_login_without_keys() {
        let harness = Harness::new();
        let session = harness.login("alice");
        assert!(session.key_pair().is_none());
        assert!(matches!(session.rotation_status(), Err(Error::NoKeyPair)));
        assert!(matches!(
            session.send_message("bob", "hi", None, None).await,
            Err(Error::NoKeyPair)
        ));
    }

    #[tokio::test]
    async fn test_rotate_publishes_and_persists() {
        let harness = Harness::new();
        let session = harness.login("alice");
        let pair = session.rotate_keys(30).await.unwrap();

        let published = harness.directory.lookup("alice").await.unwrap().unwrap();
        assert_eq!(published, pair.public_info());

        session.logout();
        let again = harness.login("alice");
        assert_eq!(again.key_pair(), Some(pair));
        assert!(!again.rotation_status().unwrap().needs_rotation);
    }

    #[tokio::test]
    async fn test_send_and_open() {
        let harness = Harness::new();
        let alice = harness.login("alice");
        let bob = harness.login("bob");
        alice.rotate_keys(30).await.unwrap();
        let bob_pair = bob.rotate_keys(30).await.unwrap();

        let outbound = alice
            .send_message("bob", "hello bob", None, Some(5))
            .await
            .unwrap();
        assert_eq!(outbound.recipient_id, "bob");
        assert_eq!(&outbound.sender_key_id, alice.key_pair().unwrap().key_id());
        assert_eq!(harness.transport.sent().len(), 1);

        let opened = bob.open_message(&outbound.package()).await.unwrap();
        assert_eq!(opened.content, "hello bob");
        assert_eq!(opened.expires_in_minutes, Some(5));
        assert_eq!(bob.key_pair().unwrap(), bob_pair);
    }

    #[tokio::test]
    async fn test_sender_cannot_open_sent_message() {
        let harness = Harness::new();
        let alice = harness.login("alice");
        let bob = harness.login("bob");
        let alice_pair = alice.rotate_keys(30).await.unwrap();
        let bob_pair = bob.rotate_keys(30).await.unwrap();
        assert_ne!(alice_pair.public_key(), bob_pair.public_key());

        let package = alice
            .send_message("bob", "for bob only", None, None)
            .await
            .unwrap()
            .package();

        assert!(matches!(
            alice.open_message(&package).await,
            Err(Error::DecryptionFailed(_))
        ));
        assert_eq!(bob.open_message(&package).await.unwrap().content, "for bob only");
    }

    #[tokio::test]
    async fn test_failed_persist_restores_directory_entry() {
        let store = Arc::new(LockableStore::new());
        let directory = Arc::new(LocalDirectory::new(store.clone()));
        let deps = SessionDeps {
            crypto: fixture_crypto(),
            store: store.clone(),
            directory: directory.clone(),
            transport: Arc::new(RecordingTransport::default()),
            image_codec: None,
        };
        let alice = Session::login("alice", deps, fast_config()).unwrap();
        let first = alice.rotate_keys(30).await.unwrap();

        store.keys_locked.store(true, Ordering::SeqCst);
        let result = alice.rotate_keys(30).await;
        assert!(matches!(result, Err(Error::StorageWriteError(_))));

        assert_eq!(
            directory.lookup("alice").await.unwrap(),
            Some(first.public_info())
        );
        assert_eq!(alice.key_pair(), Some(first));
    }

    #[tokio::test]
    async fn test_send_to_unknown_recipient() {
        let harness = Harness::new();
        let alice = harness.login("alice");
        alice.rotate_keys(30).await.unwrap();

        let result = alice.send_message("nobody", "hi", None, None).await;
        assert!(matches!(result, Err(Error::RecipientKeyNotFound(_))));
        assert!(harness.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_open_batch_isolates_failures() {
        let harness = Harness::new();
        let alice = harness.login("alice");
        let bob = harness.login("bob");
        alice.rotate_keys(30).await.unwrap();
        bob.rotate_keys(30).await.unwrap();

        let good = alice.send_message("bob", "one", None, None).await.unwrap().package();
        let mut bad = alice.send_message("bob", "two", None, None).await.unwrap().package();
        bad.content_envelope.iv = "AAAA".into();

        let results = bob.open_batch(&[good, bad]).await.unwrap();
        assert_eq!(results[0].as_ref().unwrap().content, "one");
        assert!(matches!(results[1], Err(Error::DecryptionFailed(_))));
    }

    #[tokio::test]
    async fn test_verification_scoped_to_key() {
        let harness = Harness::new();
        let alice = harness.login("alice");
        let bob = harness.login("bob");
        alice.rotate_keys(30).await.unwrap();
        bob.rotate_keys(30).await.unwrap();

        let (_, fingerprint) = alice.contact_fingerprint("bob").await.unwrap();
        let status = alice
            .compare_contact_fingerprint("bob", &fingerprint.numeric.replace(' ', ""))
            .await
            .unwrap();
        // the numeric form is not the hex form
        assert_eq!(status, VerificationStatus::Mismatch);

        let status = alice
            .compare_contact_fingerprint("bob", &fingerprint.hex.to_uppercase())
            .await
            .unwrap();
        assert_eq!(status, VerificationStatus::Verified);
        assert_eq!(
            alice.contact_status("bob").await.unwrap(),
            VerificationStatus::Verified
        );

        bob.rotate_keys(30).await.unwrap();
        assert_eq!(
            alice.contact_status("bob").await.unwrap(),
            VerificationStatus::Unverified
        );

        alice.mark_contact_verified("bob").await.unwrap();
        assert_eq!(
            alice.contact_status("bob").await.unwrap(),
            VerificationStatus::Verified
        );
    }

    #[tokio::test]
    async fn test_platform_unavailable_disables_messaging() {
        let harness = Harness::new();
        let session =
            Session::login("alice", harness.deps(Arc::new(UnavailableCrypto)), fast_config())
                .unwrap();

        let first = session.rotate_keys(30).await.unwrap_err();
        assert!(matches!(first, Error::PlatformUnavailable(_)));
        assert!(!session.is_messaging_enabled());

        let second = session.rotate_keys(30).await.unwrap_err();
        assert!(matches!(second, Error::MessagingDisabled(_)));
        assert!(harness.directory.lookup("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_backup_restore_through_session() {
        let harness = Harness::new();
        let alice = harness.login("alice");
        let pair = alice.rotate_keys(30).await.unwrap();
        let blob = alice.create_backup("pw1-long-enough").await.unwrap();
        let text = blob.to_export_text().unwrap();

        let fresh = Harness::new();
        let restored_session = fresh.login("alice");
        assert!(matches!(
            restored_session.restore_backup(&text, "wrong-password").await,
            Err(Error::BackupRestoreFailed)
        ));
        assert!(restored_session.key_pair().is_none());

        let restored = restored_session
            .restore_backup(&text, "pw1-long-enough")
            .await
            .unwrap();
        assert_eq!(restored, pair);
        assert_eq!(
            fresh.directory.lookup("alice").await.unwrap().unwrap().key_id,
            *pair.key_id()
        );
    }

    #[tokio::test]
    async fn test_corrupted_store_quarantined_then_repaired() {
        let harness = Harness::new();
        let pair = fixture_key_pair();
        let double = serde_json::to_string(&serde_json::to_string(&pair).unwrap()).unwrap();
        harness.store.put("keys/alice", &double).unwrap();

        let session = harness.login("alice");
        assert!(session.key_pair().is_none());

        let repaired = session.repair_stored_keys().await.unwrap();
        assert_eq!(repaired, pair);
        assert_eq!(session.key_pair(), Some(pair.clone()));

        let again = harness.login("alice");
        assert_eq!(again.key_pair(), Some(pair));
        assert!(matches!(
            again.repair_stored_keys().await,
            Err(Error::KeyRepairFailed)
        ));
    }

    #[test]
    fn test_login_rejects_invalid_config() {
        let harness = Harness::new();
        let mut config = fast_config();
        config.modulus_bits = 1024;
        assert!(Session::login("alice", harness.deps(fixture_crypto()), config).is_err());
    }
}
