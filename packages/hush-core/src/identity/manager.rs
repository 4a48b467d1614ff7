//! Key pair lifecycle: generation, rotation status, self-test and repair.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::config::MIN_MODULUS_BITS;
use crate::crypto::{KeyId, KeyPair, PlatformCrypto, KEY_ID_BYTES};
use crate::error::{Error, Result};
use crate::messaging::HybridCipher;
use crate::time;

/// Text round-tripped through a key pair by [`KeyPairManager::verify`]
pub const VERIFICATION_PLAINTEXT: &str = "hush key pair self-test";

/// Extra string layers [`KeyPairManager::repair`] will peel off
const MAX_REPAIR_LAYERS: usize = 2;

/// Where a key pair stands relative to its expiry
///
/// `needs_rotation` is advisory. Nothing rotates automatically; the user
/// decides when to generate new keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationStatus {
    /// The pair has reached its expiry
    pub needs_rotation: bool,
    /// Whole days left, rounded up, never negative
    pub days_remaining: u32,
    /// Expiry is close enough to show a "renew soon" warning
    pub warning_period: bool,
}

/// Generates and checks identity key pairs
///
/// Generation is pure: persisting the pair and publishing its public half is
/// up to the caller (see [`crate::Session::rotate_keys`]).
#[derive(Clone)]
pub struct KeyPairManager {
    crypto: Arc<dyn PlatformCrypto>,
    cipher: HybridCipher,
    modulus_bits: usize,
}

impl KeyPairManager {
    /// Create a manager generating 2048-bit keys
    pub fn new(crypto: Arc<dyn PlatformCrypto>) -> Self {
        Self {
            cipher: HybridCipher::new(crypto.clone()),
            crypto,
            modulus_bits: MIN_MODULUS_BITS,
        }
    }

    /// Use a larger modulus for new keys
    pub fn with_modulus_bits(mut self, modulus_bits: usize) -> Self {
        self.modulus_bits = modulus_bits.max(MIN_MODULUS_BITS);
        self
    }

    /// Generate a fresh key pair valid for `rotation_interval_days`
    ///
    /// Fails with [`Error::PlatformUnavailable`] when the host has no usable
    /// crypto, and with [`Error::KeyGenerationFailed`] for anything else.
    pub async fn generate(&self, rotation_interval_days: u32) -> Result<KeyPair> {
        if rotation_interval_days == 0 {
            return Err(Error::KeyGenerationFailed(
                "rotation interval must be at least one day".into(),
            ));
        }

        let generated = self
            .crypto
            .generate_key_pair(self.modulus_bits)
            .await
            .map_err(generation_failure)?;

        let id_bytes = self
            .crypto
            .random_bytes(KEY_ID_BYTES)
            .await
            .map_err(generation_failure)?;
        let id_bytes: [u8; KEY_ID_BYTES] = id_bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::KeyGenerationFailed("platform returned a short key id".into()))?;

        let key_pair = KeyPair::new(
            KeyId::from_random(&id_bytes),
            generated.public_key,
            generated.private_key,
            time::now(),
            rotation_interval_days,
        )
        .map_err(generation_failure)?;

        tracing::info!(
            key_id = %key_pair.key_id(),
            rotation_interval_days,
            "Generated key pair"
        );
        Ok(key_pair)
    }

    /// Rotation status as of now
    pub fn check_rotation_status(key_pair: &KeyPair, warning_window_days: u32) -> RotationStatus {
        Self::check_rotation_status_at(key_pair, time::now(), warning_window_days)
    }

    /// Rotation status as of `now`
    pub fn check_rotation_status_at(
        key_pair: &KeyPair,
        now: DateTime<Utc>,
        warning_window_days: u32,
    ) -> RotationStatus {
        let days_remaining = time::days_until_ceil(now, key_pair.expires_at());
        RotationStatus {
            needs_rotation: now >= key_pair.expires_at(),
            days_remaining,
            warning_period: days_remaining > 0 && days_remaining <= warning_window_days,
        }
    }

    /// Round-trip a fixed string through the pair's own keys
    ///
    /// Any failure, including a primitive error, is reported as
    /// [`Error::KeyVerificationFailed`].
    pub async fn verify(&self, key_pair: &KeyPair) -> Result<()> {
        let envelope = self
            .cipher
            .encrypt_message(VERIFICATION_PLAINTEXT, key_pair.public_key())
            .await
            .map_err(verification_failure)?;
        let decrypted = self
            .cipher
            .decrypt_message(&envelope, key_pair.private_key())
            .await
            .map_err(verification_failure)?;

        if decrypted != VERIFICATION_PLAINTEXT {
            tracing::warn!(key_id = %key_pair.key_id(), "Key pair self-test mismatch");
            return Err(Error::KeyVerificationFailed("round trip mismatch".into()));
        }

        tracing::debug!(key_id = %key_pair.key_id(), "Key pair verified");
        Ok(())
    }

    /// Try to recover a key pair from a double-serialized stored record
    ///
    /// Peels up to two extra JSON string layers around the whole record or
    /// around `publicKey` / `privateKey`, then runs [`Self::verify`] on the
    /// result. Anything short of a verified pair is
    /// [`Error::KeyRepairFailed`], meaning new keys must be generated.
    ///
    /// This exists to migrate records written by an old buggy write path.
    pub async fn repair(&self, raw_record: &str) -> Result<KeyPair> {
        tracing::info!("Attempting key pair repair");

        let candidate = match unwrap_record(raw_record) {
            Some(candidate) => candidate,
            None => {
                tracing::warn!("Key pair record is not repairable");
                return Err(Error::KeyRepairFailed);
            }
        };

        match self.verify(&candidate).await {
            Ok(()) => {
                tracing::info!(key_id = %candidate.key_id(), "Repaired key pair");
                Ok(candidate)
            }
            Err(_) => {
                tracing::warn!(key_id = %candidate.key_id(), "Repaired key pair failed self-test");
                Err(Error::KeyRepairFailed)
            }
        }
    }
}

fn unwrap_record(raw_record: &str) -> Option<KeyPair> {
    let mut value = peel_string_layers(serde_json::from_str(raw_record.trim()).ok()?)?;

    if let Value::Object(map) = &mut value {
        for field in ["publicKey", "privateKey"] {
            if let Some(inner) = map.remove(field) {
                map.insert(field.to_string(), peel_string_layers(inner)?);
            }
        }
    }

    serde_json::from_value(value).ok()
}

fn peel_string_layers(mut value: Value) -> Option<Value> {
    for _ in 0..MAX_REPAIR_LAYERS {
        let inner = match &value {
            Value::String(text) => serde_json::from_str(text).ok()?,
            _ => break,
        };
        value = inner;
    }
    Some(value)
}

fn generation_failure(error: Error) -> Error {
    match error {
        Error::PlatformUnavailable(_) | Error::KeyGenerationFailed(_) => error,
        other => Error::KeyGenerationFailed(other.to_string()),
    }
}

fn verification_failure(error: Error) -> Error {
    match error {
        Error::KeyVerificationFailed(_) => error,
        other => Error::KeyVerificationFailed(other.to_string()),
    }
}

// ============================================================================
// TESTS
// ============================================================================
