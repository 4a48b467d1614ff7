//! The platform crypto capability.
//!
//! Hush Core never talks to a crypto library directly for asymmetric work.
//! Each host (native, browser, mobile) supplies an implementation of
//! [`PlatformCrypto`] over its own primitives; [`super::NativeCrypto`] is the
//! pure-Rust one.

use async_trait::async_trait;
use zeroize::Zeroizing;

use super::encryption::{Iv, SymmetricKey, IV_SIZE, KEY_SIZE};
use super::keys::KeyMaterial;
use crate::error::{Error, Result};

/// A freshly generated asymmetric key pair, before it gets an id and dates
pub struct GeneratedKeys {
    /// SPKI public key
    pub public_key: KeyMaterial,
    /// PKCS#8 private key
    pub private_key: KeyMaterial,
}

/// Primitive operations supplied by the host platform
///
/// Every method is async; implementations may suspend at the platform
/// boundary. Implementations hold no per-call mutable state, so any number
/// of calls may be in flight at once.
///
/// An implementation that cannot provide secure primitives at all must fail
/// with [`Error::PlatformUnavailable`] rather than fall back to something
/// weaker.
#[async_trait]
pub trait PlatformCrypto: Send + Sync {
    /// Generate an RSA-OAEP (SHA-256) key pair
    async fn generate_key_pair(&self, modulus_bits: usize) -> Result<GeneratedKeys>;

    /// Encrypt a symmetric key to a public key
    async fn wrap_key(&self, public_key: &KeyMaterial, key: &SymmetricKey) -> Result<Vec<u8>>;

    /// Recover a symmetric key with a private key
    async fn unwrap_key(&self, private_key: &KeyMaterial, wrapped: &[u8]) -> Result<SymmetricKey>;

    /// AES-256-GCM encrypt
    async fn encrypt_symmetric(
        &self,
        key: &SymmetricKey,
        iv: &Iv,
        plaintext: &[u8],
    ) -> Result<Vec<u8>>;

    /// AES-256-GCM decrypt
    async fn decrypt_symmetric(
        &self,
        key: &SymmetricKey,
        iv: &Iv,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>>;

    /// SHA-256
    async fn digest(&self, data: &[u8]) -> Result<[u8; 32]>;

    /// Cryptographically secure random bytes
    async fn random_bytes(&self, len: usize) -> Result<Vec<u8>>;

    /// Big-endian modulus of a public key
    async fn public_modulus(&self, public_key: &KeyMaterial) -> Result<Vec<u8>>;

    /// A fresh single-use message key
    async fn generate_symmetric_key(&self) -> Result<SymmetricKey> {
        let bytes = Zeroizing::new(self.random_bytes(KEY_SIZE).await?);
        SymmetricKey::from_slice(&bytes).map_err(|_| Error::RngFailed)
    }

    /// A fresh 96-bit IV
    async fn generate_iv(&self) -> Result<Iv> {
        let bytes = self.random_bytes(IV_SIZE).await?;
        Iv::from_slice(&bytes).map_err(|_| Error::RngFailed)
    }
}
