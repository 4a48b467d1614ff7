//! Pure-Rust [`PlatformCrypto`] backend.
//!
//! | Primitive | Implementation |
//! |-----------|----------------|
//! | Key pairs | RSA-OAEP, SHA-256 (`rsa`) |
//! | Key wrap | RSA-OAEP encrypt of the 32-byte message key |
//! | Bulk | AES-256-GCM (`aes-gcm`) |
//! | Digest | SHA-256 (`sha2`) |
//! | Random | `OsRng` |

use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::encryption::{self, Iv, SymmetricKey};
use super::keys::{KeyKind, KeyMaterial};
use super::platform::{GeneratedKeys, PlatformCrypto};
use crate::config::MIN_MODULUS_BITS;
use crate::error::{Error, Result};

/// Native crypto backed by RustCrypto crates
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCrypto;

impl NativeCrypto {
    /// Create the backend
    pub fn new() -> Self {
        Self
    }

    fn parse_public(public_key: &KeyMaterial) -> Result<RsaPublicKey> {
        public_key.expect_kind(KeyKind::Public)?;
        RsaPublicKey::from_public_key_der(public_key.der())
            .map_err(|e| Error::InvalidKey(format!("malformed public key: {}", e)))
    }

    fn parse_private(private_key: &KeyMaterial) -> Result<RsaPrivateKey> {
        private_key.expect_kind(KeyKind::Private)?;
        RsaPrivateKey::from_pkcs8_der(private_key.der())
            .map_err(|_| Error::InvalidKey("malformed private key".into()))
    }

    pub(crate) fn generate_blocking(modulus_bits: usize) -> Result<GeneratedKeys> {
        let private = RsaPrivateKey::new(&mut OsRng, modulus_bits)
            .map_err(|e| Error::KeyGenerationFailed(e.to_string()))?;
        let public = private.to_public_key();

        let spki = public
            .to_public_key_der()
            .map_err(|e| Error::KeyGenerationFailed(format!("SPKI export failed: {}", e)))?;
        let pkcs8 = private
            .to_pkcs8_der()
            .map_err(|e| Error::KeyGenerationFailed(format!("PKCS#8 export failed: {}", e)))?;

        Ok(GeneratedKeys {
            public_key: KeyMaterial::rsa_public(spki.as_bytes().to_vec())?,
            private_key: KeyMaterial::rsa_private(pkcs8.as_bytes().to_vec())?,
        })
    }
}

#[async_trait]
impl PlatformCrypto for NativeCrypto {
    async fn generate_key_pair(&self, modulus_bits: usize) -> Result<GeneratedKeys> {
        if modulus_bits < MIN_MODULUS_BITS {
            return Err(Error::KeyGenerationFailed(format!(
                "modulus of {} bits is below the {} bit minimum",
                modulus_bits, MIN_MODULUS_BITS
            )));
        }

        // Prime search takes long enough to stall a cooperative scheduler.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle
                .spawn_blocking(move || Self::generate_blocking(modulus_bits))
                .await
                .map_err(|e| Error::Internal(format!("key generation task failed: {}", e)))?,
            Err(_) => Self::generate_blocking(modulus_bits),
        }
    }

    async fn wrap_key(&self, public_key: &KeyMaterial, key: &SymmetricKey) -> Result<Vec<u8>> {
        let public = Self::parse_public(public_key)?;
        public
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), key.as_bytes())
            .map_err(|e| Error::EncryptionFailed(format!("wrap failed: {}", e)))
    }

    async fn unwrap_key(&self, private_key: &KeyMaterial, wrapped: &[u8]) -> Result<SymmetricKey> {
        let private = Self::parse_private(private_key)?;
        let raw = private
            .decrypt_blinded(&mut OsRng, Oaep::new::<Sha256>(), wrapped)
            .map(Zeroizing::new)
            .map_err(|_| Error::DecryptionFailed("unwrap failed".into()))?;
        SymmetricKey::from_slice(&raw)
            .map_err(|_| Error::DecryptionFailed("unwrapped key has wrong length".into()))
    }

    async fn encrypt_symmetric(
        &self,
        key: &SymmetricKey,
        iv: &Iv,
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        encryption::encrypt(key, iv, plaintext)
    }

    async fn decrypt_symmetric(
        &self,
        key: &SymmetricKey,
        iv: &Iv,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        encryption::decrypt(key, iv, ciphertext)
    }

    async fn digest(&self, data: &[u8]) -> Result<[u8; 32]> {
        let mut out = [0u8; 32];
        out.copy_from_slice(&Sha256::digest(data));
        Ok(out)
    }

    async fn random_bytes(&self, len: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; len];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|_| Error::RngFailed)?;
        Ok(bytes)
    }

    async fn public_modulus(&self, public_key: &KeyMaterial) -> Result<Vec<u8>> {
        let public = Self::parse_public(public_key)?;
        Ok(public.n().to_bytes_be())
    }
}

// ============================================================================
// TESTS
// ============================================================================
