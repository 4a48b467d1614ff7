//! The hybrid cipher.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::future::{join_all, try_join};
use zeroize::Zeroizing;

use super::media::{fit_image, ImageCodec};
use super::{DecryptedMessage, Envelope, MessagePackage};
use crate::config::ImagePolicy;
use crate::crypto::{Iv, KeyKind, KeyMaterial, PlatformCrypto};
use crate::error::{Error, Result};

/// Per-message hybrid encryption over a [`PlatformCrypto`]
///
/// Holds no mutable state: every call generates its own key and IV, so any
/// number of encryptions and decryptions may run concurrently.
#[derive(Clone)]
pub struct HybridCipher {
    crypto: Arc<dyn PlatformCrypto>,
    image_policy: ImagePolicy,
    codec: Option<Arc<dyn ImageCodec>>,
}

impl HybridCipher {
    /// Create a cipher with the default image policy and no image codec
    pub fn new(crypto: Arc<dyn PlatformCrypto>) -> Self {
        Self {
            crypto,
            image_policy: ImagePolicy::default(),
            codec: None,
        }
    }

    /// Use `codec` to shrink images that exceed `policy`
    pub fn with_images(mut self, policy: ImagePolicy, codec: Option<Arc<dyn ImageCodec>>) -> Self {
        self.image_policy = policy;
        self.codec = codec;
        self
    }

    // ========================================================================
    // TEXT
    // ========================================================================

    /// Encrypt text for one recipient
    pub async fn encrypt_message(&self, plaintext: &str, recipient: &KeyMaterial) -> Result<Envelope> {
        self.seal(plaintext.as_bytes(), recipient).await
    }

    /// Decrypt text with our private key
    pub async fn decrypt_message(&self, envelope: &Envelope, private_key: &KeyMaterial) -> Result<String> {
        let plaintext = self.open(envelope, private_key).await?;
        String::from_utf8(plaintext.to_vec())
            .map_err(|_| Error::DecryptionFailed("plaintext is not UTF-8".into()))
    }

    /// Decrypt many envelopes independently
    ///
    /// Results come back in input order; one failure does not affect the
    /// others.
    pub async fn decrypt_batch(
        &self,
        envelopes: &[Envelope],
        private_key: &KeyMaterial,
    ) -> Vec<Result<String>> {
        join_all(
            envelopes
                .iter()
                .map(|envelope| self.decrypt_message(envelope, private_key)),
        )
        .await
    }

    // ========================================================================
    // IMAGES
    // ========================================================================

    /// Encrypt a base64 image or data URL, downscaling it first if too large
    pub async fn encrypt_image(&self, image: &str, recipient: &KeyMaterial) -> Result<Envelope> {
        let fitted = fit_image(image, &self.image_policy, self.codec.as_deref()).await?;
        self.seal(fitted.as_bytes(), recipient).await
    }

    /// Decrypt an image payload
    pub async fn decrypt_image(&self, envelope: &Envelope, private_key: &KeyMaterial) -> Result<String> {
        self.decrypt_message(envelope, private_key).await
    }

    // ========================================================================
    // PACKAGES
    // ========================================================================

    /// Build a transport-ready package
    ///
    /// Text and image are encrypted independently, each under its own key.
    pub async fn prepare_message_package(
        &self,
        content: &str,
        recipient: &KeyMaterial,
        image: Option<&str>,
        expires_in_minutes: Option<u32>,
    ) -> Result<MessagePackage> {
        let (content_envelope, image_envelope) = match image {
            Some(image) => {
                let (content, image) = try_join(
                    self.encrypt_message(content, recipient),
                    self.encrypt_image(image, recipient),
                )
                .await?;
                (content, Some(image))
            }
            None => (self.encrypt_message(content, recipient).await?, None),
        };

        Ok(MessagePackage {
            content_envelope,
            image_envelope,
            expires_in_minutes,
        })
    }

    /// Decrypt a package
    pub async fn decrypt_package(
        &self,
        package: &MessagePackage,
        private_key: &KeyMaterial,
    ) -> Result<DecryptedMessage> {
        let content = self
            .decrypt_message(&package.content_envelope, private_key)
            .await?;
        let image = match &package.image_envelope {
            Some(envelope) => Some(self.decrypt_image(envelope, private_key).await?),
            None => None,
        };

        Ok(DecryptedMessage {
            content,
            image,
            expires_in_minutes: package.expires_in_minutes,
        })
    }

    // ========================================================================
    // ENVELOPE PROTOCOL
    // ========================================================================

    async fn seal(&self, plaintext: &[u8], recipient: &KeyMaterial) -> Result<Envelope> {
        recipient
            .expect_kind(KeyKind::Public)
            .map_err(encryption_failure)?;

        let key = self
            .crypto
            .generate_symmetric_key()
            .await
            .map_err(encryption_failure)?;
        let iv = self.crypto.generate_iv().await.map_err(encryption_failure)?;

        let ciphertext = self
            .crypto
            .encrypt_symmetric(&key, &iv, plaintext)
            .await
            .map_err(encryption_failure)?;
        let wrapped = self
            .crypto
            .wrap_key(recipient, &key)
            .await
            .map_err(encryption_failure)?;

        Ok(Envelope {
            ciphertext: BASE64.encode(ciphertext),
            wrapped_symmetric_key: BASE64.encode(wrapped),
            iv: BASE64.encode(iv.as_bytes()),
        })
    }

    async fn open(&self, envelope: &Envelope, private_key: &KeyMaterial) -> Result<Zeroizing<Vec<u8>>> {
        private_key
            .expect_kind(KeyKind::Private)
            .map_err(decryption_failure)?;

        let ciphertext = decode_field(&envelope.ciphertext, "ciphertext")?;
        let wrapped = decode_field(&envelope.wrapped_symmetric_key, "wrapped key")?;
        let iv = Iv::from_slice(&decode_field(&envelope.iv, "iv")?).map_err(decryption_failure)?;

        let key = self
            .crypto
            .unwrap_key(private_key, &wrapped)
            .await
            .map_err(decryption_failure)?;
        let plaintext = self
            .crypto
            .decrypt_symmetric(&key, &iv, &ciphertext)
            .await
            .map_err(decryption_failure)?;

        Ok(Zeroizing::new(plaintext))
    }
}

fn decode_field(value: &str, field: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(value.trim())
        .map_err(|_| Error::DecryptionFailed(format!("malformed {}", field)))
}

/// Collapse any failure on the encrypt path into `EncryptionFailed`, except
/// platform unavailability which must stay visible to the session.
fn encryption_failure(error: Error) -> Error {
    match error {
        Error::PlatformUnavailable(_) | Error::EncryptionFailed(_) => error,
        other => Error::EncryptionFailed(other.to_string()),
    }
}

fn decryption_failure(error: Error) -> Error {
    match error {
        Error::PlatformUnavailable(_) | Error::DecryptionFailed(_) => error,
        other => Error::DecryptionFailed(other.to_string()),
    }
}

// ============================================================================
// TESTS
// ============================================================================
