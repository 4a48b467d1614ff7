//! # Key Fingerprints
//!
//! Short, human-comparable digests of a public key, used to check out of
//! band that a contact's key really is theirs.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      FINGERPRINT DERIVATION                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  RSA modulus (big-endian bytes)                                        │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  SHA-256 ──► first 16 bytes                                            │
//! │                   │                                                     │
//! │         ┌─────────┴──────────┐                                          │
//! │         ▼                    ▼                                          │
//! │  hex (read aloud)     numeric (spoken)                                 │
//! │  "3f2a 9c01 ..."      "16170 39937 ..."                                │
//! │  8 × 4 hex chars      8 × 5 digits (one u16 per group)                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::crypto::{KeyMaterial, PlatformCrypto};
use crate::error::{Error, Result};

/// Digest bytes kept in a fingerprint
pub const FINGERPRINT_BYTES: usize = 16;

/// Hex characters needed to rebuild a fingerprint
pub const FINGERPRINT_HEX_LEN: usize = FINGERPRINT_BYTES * 2;

const HEX_GROUP_LEN: usize = 4;

/// A fingerprint in both display forms
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Eight groups of four lowercase hex characters
    pub hex: String,
    /// Eight groups of five decimal digits
    pub numeric: String,
}

impl Fingerprint {
    /// Render a digest prefix
    pub fn from_bytes(bytes: &[u8; FINGERPRINT_BYTES]) -> Self {
        let compact = hex::encode(bytes);
        let hex = compact
            .as_bytes()
            .chunks(HEX_GROUP_LEN)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join(" ");

        let numeric = bytes
            .chunks(2)
            .map(|pair| format!("{:05}", u16::from_be_bytes([pair[0], pair[1]])))
            .collect::<Vec<_>>()
            .join(" ");

        Self { hex, numeric }
    }

    /// The hex form with grouping removed
    pub fn compact_hex(&self) -> String {
        self.hex.chars().filter(|c| !c.is_whitespace()).collect()
    }

    /// Whether `other` (in any grouping or case) is this fingerprint
    pub fn matches(&self, other: &str) -> bool {
        FingerprintService::compare(&self.hex, other)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

/// Derives and compares fingerprints
#[derive(Clone)]
pub struct FingerprintService {
    crypto: Arc<dyn PlatformCrypto>,
}

impl FingerprintService {
    /// Create a service over the platform crypto
    pub fn new(crypto: Arc<dyn PlatformCrypto>) -> Self {
        Self { crypto }
    }

    /// Fingerprint of a public key
    ///
    /// Deterministic: the same key always gives the same fingerprint.
    pub async fn derive(&self, public_key: &KeyMaterial) -> Result<Fingerprint> {
        let modulus = self
            .crypto
            .public_modulus(public_key)
            .await
            .map_err(|e| match e {
                Error::PlatformUnavailable(_) => e,
                other => Error::FingerprintInvalid(other.to_string()),
            })?;
        let digest = self.crypto.digest(&modulus).await?;

        let mut prefix = [0u8; FINGERPRINT_BYTES];
        prefix.copy_from_slice(&digest[..FINGERPRINT_BYTES]);
        Ok(Fingerprint::from_bytes(&prefix))
    }

    /// Parse user input into a fingerprint
    ///
    /// Keeps hex characters only and lowercases them. Returns `None` for
    /// anything with fewer than 32 hex characters; never errors.
    pub fn normalize(raw: &str) -> Option<Fingerprint> {
        let compact = normalized_hex(raw)?;
        let mut bytes = [0u8; FINGERPRINT_BYTES];
        hex::decode_to_slice(&compact, &mut bytes).ok()?;
        Some(Fingerprint::from_bytes(&bytes))
    }

    /// Compare two fingerprints irrespective of grouping, whitespace and case
    ///
    /// Malformed input on either side compares unequal.
    pub fn compare(a: &str, b: &str) -> bool {
        match (normalized_hex(a), normalized_hex(b)) {
            (Some(a), Some(b)) => a.as_bytes().ct_eq(b.as_bytes()).into(),
            _ => false,
        }
    }
}

fn normalized_hex(raw: &str) -> Option<String> {
    let hex: String = raw
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if hex.len() < FINGERPRINT_HEX_LEN {
        return None;
    }
    Some(hex[..FINGERPRINT_HEX_LEN].to_string())
}

// ============================================================================
// TESTS
// ============================================================================
