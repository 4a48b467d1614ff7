//! Configuration for Hush Core.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Smallest RSA modulus accepted for identity keys
pub const MIN_MODULUS_BITS: usize = 2048;

/// Longest rotation interval accepted in a config (ten years)
pub const MAX_ROTATION_INTERVAL_DAYS: u32 = 3650;

/// Largest Argon2 memory cost accepted (1 GiB)
pub const MAX_KDF_MEMORY_KIB: u32 = 1024 * 1024;

/// Largest Argon2 pass count accepted
pub const MAX_KDF_ITERATIONS: u32 = 64;

/// Largest Argon2 lane count accepted
pub const MAX_KDF_PARALLELISM: u32 = 16;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HushConfig {
    /// Lifetime of a freshly generated key pair
    pub rotation_interval_days: u32,
    /// Days before expiry in which a "renew soon" warning is shown
    pub warning_window_days: u32,
    /// RSA modulus size for identity keys
    pub modulus_bits: usize,
    /// Image size policy
    pub image: ImagePolicy,
    /// Backup policy
    pub backup: BackupPolicy,
}

impl Default for HushConfig {
    fn default() -> Self {
        Self {
            rotation_interval_days: 30,
            warning_window_days: 3,
            modulus_bits: MIN_MODULUS_BITS,
            image: ImagePolicy::default(),
            backup: BackupPolicy::default(),
        }
    }
}

impl HushConfig {
    /// Parse a JSON config document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would weaken the cryptography
    pub fn validate(&self) -> Result<()> {
        if self.modulus_bits < MIN_MODULUS_BITS {
            return Err(Error::Internal(format!(
                "modulusBits must be at least {}, got {}",
                MIN_MODULUS_BITS, self.modulus_bits
            )));
        }
        if self.rotation_interval_days == 0 || self.rotation_interval_days > MAX_ROTATION_INTERVAL_DAYS {
            return Err(Error::Internal(format!(
                "rotationIntervalDays must be between 1 and {}",
                MAX_ROTATION_INTERVAL_DAYS
            )));
        }
        if self.image.max_edge_px == 0 || !(1..=100).contains(&self.image.jpeg_quality) {
            return Err(Error::Internal("invalid image policy".into()));
        }
        if !self.backup.kdf.within_limits() {
            return Err(Error::Internal("invalid backup KDF parameters".into()));
        }
        Ok(())
    }
}

/// When and how images are downscaled before encryption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImagePolicy {
    /// Base64 payloads longer than this are downscaled
    pub max_payload_base64_len: usize,
    /// Long-edge cap in pixels
    pub max_edge_px: u32,
    /// JPEG re-encode quality, 1-100
    pub jpeg_quality: u8,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self {
            max_payload_base64_len: 1_048_576,
            max_edge_px: 1200,
            jpeg_quality: 85,
        }
    }
}

/// Backup creation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackupPolicy {
    /// Minimum password length in characters
    pub min_password_length: usize,
    /// KDF cost for new backups
    pub kdf: KdfParams,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self {
            min_password_length: 8,
            kdf: KdfParams::default(),
        }
    }
}

/// Argon2id cost parameters
///
/// Stored inside every backup blob so that later policy changes never make
/// old backups unreadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Time cost
    pub iterations: u32,
    /// Lanes
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        // OWASP minimum for Argon2id
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Nonzero costs no larger than the caps, which also bound what a
    /// backup blob can make a restore spend
    pub fn within_limits(&self) -> bool {
        (1..=MAX_KDF_MEMORY_KIB).contains(&self.memory_kib)
            && (1..=MAX_KDF_ITERATIONS).contains(&self.iterations)
            && (1..=MAX_KDF_PARALLELISM).contains(&self.parallelism)
    }
}
