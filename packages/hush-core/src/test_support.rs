//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::config::{HushConfig, KdfParams};
use crate::crypto::{
    GeneratedKeys, Iv, KeyId, KeyMaterial, KeyPair, NativeCrypto, PlatformCrypto, SymmetricKey,
};
use crate::error::{Error, Result};
use crate::messaging::{ImageCodec, OutboundMessage};
use crate::session::MessageTransport;
use crate::time;

static PRIMARY: Lazy<GeneratedKeys> = Lazy::new(|| generate());
static SECONDARY: Lazy<GeneratedKeys> = Lazy::new(|| generate());

fn generate() -> GeneratedKeys {
    NativeCrypto::generate_blocking(2048).unwrap()
}

/// A 2048-bit key pair generated once per test binary
pub fn fixture_keys() -> (KeyMaterial, KeyMaterial) {
    (PRIMARY.public_key.clone(), PRIMARY.private_key.clone())
}

/// A second, unrelated key pair
pub fn other_fixture_keys() -> (KeyMaterial, KeyMaterial) {
    (SECONDARY.public_key.clone(), SECONDARY.private_key.clone())
}

/// The primary fixture as a 30-day `KeyPair` created now
pub fn fixture_key_pair() -> KeyPair {
    let (public, private) = fixture_keys();
    KeyPair::new(
        KeyId::from_random(&[0x11; 16]),
        public,
        private,
        time::now(),
        30,
    )
    .unwrap()
}

/// Default config with a cheap KDF
pub fn fast_config() -> HushConfig {
    let mut config = HushConfig::default();
    config.backup.kdf = KdfParams {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };
    config
}

/// Native crypto that hands out the fixture keys instead of generating
///
/// Successive generations alternate between the primary and secondary
/// fixture, so two users sharing one instance get different keys.
#[derive(Default)]
pub struct FixtureCrypto {
    generated: AtomicUsize,
}

#[async_trait]
impl PlatformCrypto for FixtureCrypto {
    async fn generate_key_pair(&self, _modulus_bits: usize) -> Result<GeneratedKeys> {
        let (public_key, private_key) = if self.generated.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            fixture_keys()
        } else {
            other_fixture_keys()
        };
        Ok(GeneratedKeys {
            public_key,
            private_key,
        })
    }

    async fn wrap_key(&self, public_key: &KeyMaterial, key: &SymmetricKey) -> Result<Vec<u8>> {
        NativeCrypto.wrap_key(public_key, key).await
    }

    async fn unwrap_key(&self, private_key: &KeyMaterial, wrapped: &[u8]) -> Result<SymmetricKey> {
        NativeCrypto.unwrap_key(private_key, wrapped).await
    }

    async fn encrypt_symmetric(
        &self,
        key: &SymmetricKey,
        iv: &Iv,
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        NativeCrypto.encrypt_symmetric(key, iv, plaintext).await
    }

    async fn decrypt_symmetric(
        &self,
        key: &SymmetricKey,
        iv: &Iv,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        NativeCrypto.decrypt_symmetric(key, iv, ciphertext).await
    }

    async fn digest(&self, data: &[u8]) -> Result<[u8; 32]> {
        NativeCrypto.digest(data).await
    }

    async fn random_bytes(&self, len: usize) -> Result<Vec<u8>> {
        NativeCrypto.random_bytes(len).await
    }

    async fn public_modulus(&self, public_key: &KeyMaterial) -> Result<Vec<u8>> {
        NativeCrypto.public_modulus(public_key).await
    }
}

/// A host without usable crypto
pub struct UnavailableCrypto;

#[async_trait]
impl PlatformCrypto for UnavailableCrypto {
    async fn generate_key_pair(&self, _modulus_bits: usize) -> Result<GeneratedKeys> {
        Err(Error::PlatformUnavailable("no secure context".into()))
    }

    async fn wrap_key(&self, _: &KeyMaterial, _: &SymmetricKey) -> Result<Vec<u8>> {
        Err(Error::PlatformUnavailable("no secure context".into()))
    }

    async fn unwrap_key(&self, _: &KeyMaterial, _: &[u8]) -> Result<SymmetricKey> {
        Err(Error::PlatformUnavailable("no secure context".into()))
    }

    async fn encrypt_symmetric(&self, _: &SymmetricKey, _: &Iv, _: &[u8]) -> Result<Vec<u8>> {
        Err(Error::PlatformUnavailable("no secure context".into()))
    }

    async fn decrypt_symmetric(&self, _: &SymmetricKey, _: &Iv, _: &[u8]) -> Result<Vec<u8>> {
        Err(Error::PlatformUnavailable("no secure context".into()))
    }

    async fn digest(&self, _: &[u8]) -> Result<[u8; 32]> {
        Err(Error::PlatformUnavailable("no secure context".into()))
    }

    async fn random_bytes(&self, _: usize) -> Result<Vec<u8>> {
        Err(Error::PlatformUnavailable("no secure context".into()))
    }

    async fn public_modulus(&self, _: &KeyMaterial) -> Result<Vec<u8>> {
        Err(Error::PlatformUnavailable("no secure context".into()))
    }
}

/// Shared handle to the fixture platform
pub fn fixture_crypto() -> Arc<dyn PlatformCrypto> {
    Arc::new(FixtureCrypto::default())
}

/// Image codec that returns canned output and records requests
pub struct ScriptedCodec {
    output: Vec<u8>,
    requests: Mutex<Vec<(usize, u32, u8)>>,
}

impl ScriptedCodec {
    /// Always answer with `output`
    pub fn new(output: Vec<u8>) -> Self {
        Self {
            output,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of downscale calls
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// `(input_len, max_edge_px, quality)` of the last call
    pub fn last_request(&self) -> Option<(usize, u32, u8)> {
        self.requests.lock().last().copied()
    }
}

#[async_trait]
impl ImageCodec for ScriptedCodec {
    async fn downscale(&self, image: &[u8], max_edge_px: u32, quality: u8) -> Result<Vec<u8>> {
        self.requests.lock().push((image.len(), max_edge_px, quality));
        Ok(self.output.clone())
    }
}

/// Transport that keeps everything it is given
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingTransport {
    /// Messages handed over so far
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<()> {
        self.sent.lock().push(message.clone());
        Ok(())
    }
}
