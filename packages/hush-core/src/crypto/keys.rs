//! # Key Material
//!
//! Validated, tagged representations of identity keys as they are stored and
//! exchanged.
//!
//! ## Key Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY TYPES                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  KeyMaterial                                                           │
//! │  ───────────                                                            │
//! │  { "kind": "public" | "private",                                       │
//! │    "algorithm": "RSA-OAEP-256",                                        │
//! │    "der": <base64> }                                                   │
//! │                                                                         │
//! │  • public  → SPKI DER, shared freely                                   │
//! │  • private → PKCS#8 DER, zeroized on drop, never logged                │
//! │                                                                         │
//! │  KeyPair                                                               │
//! │  ───────                                                                │
//! │  { keyId, publicKey, privateKey, createdAt, expiresAt,                 │
//! │    rotationIntervalDays }                                              │
//! │                                                                         │
//! │  Invariant: expiresAt == createdAt + rotationIntervalDays              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};
use crate::time;

/// Which half of a key pair a [`KeyMaterial`] holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// SPKI-encoded public key
    Public,
    /// PKCS#8-encoded private key
    Private,
}

/// Asymmetric algorithm of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// RSA-OAEP with SHA-256
    #[serde(rename = "RSA-OAEP-256")]
    RsaOaepSha256,
}

/// Wire form of [`KeyMaterial`], validated on the way in
#[derive(Deserialize)]
struct KeyMaterialRecord {
    kind: KeyKind,
    algorithm: KeyAlgorithm,
    der: String,
}

/// Encoded asymmetric key
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(try_from = "KeyMaterialRecord")]
pub struct KeyMaterial {
    #[zeroize(skip)]
    kind: KeyKind,
    #[zeroize(skip)]
    algorithm: KeyAlgorithm,
    #[serde(serialize_with = "serialize_base64")]
    der: Vec<u8>,
}

impl TryFrom<KeyMaterialRecord> for KeyMaterial {
    type Error = Error;

    fn try_from(record: KeyMaterialRecord) -> Result<Self> {
        let der = BASE64
            .decode(record.der.trim())
            .map_err(|e| Error::InvalidKey(format!("key material is not base64: {}", e)))?;
        Self::new(record.kind, record.algorithm, der)
    }
}

fn serialize_base64<S>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(bytes))
}

impl KeyMaterial {
    /// Construct, rejecting empty encodings
    pub fn new(kind: KeyKind, algorithm: KeyAlgorithm, der: Vec<u8>) -> Result<Self> {
        if der.is_empty() {
            return Err(Error::InvalidKey("key material is empty".into()));
        }
        Ok(Self {
            kind,
            algorithm,
            der,
        })
    }

    /// RSA-OAEP public key from SPKI DER
    pub fn rsa_public(der: Vec<u8>) -> Result<Self> {
        Self::new(KeyKind::Public, KeyAlgorithm::RsaOaepSha256, der)
    }

    /// RSA-OAEP private key from PKCS#8 DER
    pub fn rsa_private(der: Vec<u8>) -> Result<Self> {
        Self::new(KeyKind::Private, KeyAlgorithm::RsaOaepSha256, der)
    }

    /// Public or private
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Algorithm
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Raw DER bytes
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Fail unless this is a key of the expected kind
    pub fn expect_kind(&self, kind: KeyKind) -> Result<&Self> {
        if self.kind != kind {
            return Err(Error::InvalidKey(format!(
                "expected {:?} key, got {:?}",
                kind, self.kind
            )));
        }
        Ok(self)
    }
}

impl PartialEq for KeyMaterial {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.algorithm == other.algorithm && self.der == other.der
    }
}

impl Eq for KeyMaterial {}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let der = match self.kind {
            KeyKind::Public => BASE64.encode(&self.der),
            KeyKind::Private => "[REDACTED]".to_string(),
        };
        f.debug_struct("KeyMaterial")
            .field("kind", &self.kind)
            .field("algorithm", &self.algorithm)
            .field("der", &der)
            .finish()
    }
}

// ============================================================================
// KEY IDS
// ============================================================================

/// Size of a generated key id in bytes (128 bits)
pub const KEY_ID_BYTES: usize = 16;

/// Opaque identifier of one key generation event
///
/// Locally generated ids are 32 lowercase hex characters. Ids received from
/// the directory are accepted if they are short ASCII tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyId(String);

impl KeyId {
    /// Build from 128 random bits
    pub fn from_random(bytes: &[u8; KEY_ID_BYTES]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Parse a key id token
    pub fn parse(token: &str) -> Result<Self> {
        let valid = !token.is_empty()
            && token.len() <= 128
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::InvalidKey(format!("invalid key id '{}'", token)));
        }
        Ok(Self(token.to_string()))
    }

    /// The id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for KeyId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<KeyId> for String {
    fn from(id: KeyId) -> Self {
        id.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// KEY PAIRS
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyPairRecord {
    key_id: KeyId,
    public_key: KeyMaterial,
    private_key: KeyMaterial,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    rotation_interval_days: u32,
}

/// An identity key pair owned by the local device
///
/// The private half never leaves the device unencrypted; it is only
/// serialized into the local key store and into password-encrypted backups.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "KeyPairRecord")]
pub struct KeyPair {
    key_id: KeyId,
    public_key: KeyMaterial,
    private_key: KeyMaterial,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    rotation_interval_days: u32,
}

impl TryFrom<KeyPairRecord> for KeyPair {
    type Error = Error;

    fn try_from(record: KeyPairRecord) -> Result<Self> {
        let pair = Self::new(
            record.key_id,
            record.public_key,
            record.private_key,
            record.created_at,
            record.rotation_interval_days,
        )?;
        if pair.expires_at != record.expires_at {
            return Err(Error::InvalidKey(
                "expiresAt does not match createdAt + rotationIntervalDays".into(),
            ));
        }
        Ok(pair)
    }
}

impl KeyPair {
    /// Assemble a key pair, deriving `expires_at` from the interval
    pub fn new(
        key_id: KeyId,
        public_key: KeyMaterial,
        private_key: KeyMaterial,
        created_at: DateTime<Utc>,
        rotation_interval_days: u32,
    ) -> Result<Self> {
        public_key.expect_kind(KeyKind::Public)?;
        private_key.expect_kind(KeyKind::Private)?;
        if public_key.algorithm() != private_key.algorithm() {
            return Err(Error::InvalidKey("key halves use different algorithms".into()));
        }
        let expires_at = time::add_days(created_at, rotation_interval_days).ok_or_else(|| {
            Error::InvalidKey(format!(
                "rotation interval of {} days is out of range",
                rotation_interval_days
            ))
        })?;
        Ok(Self {
            key_id,
            public_key,
            private_key,
            created_at,
            expires_at,
            rotation_interval_days,
        })
    }

    /// Unique id of this generation
    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    /// Public half
    pub fn public_key(&self) -> &KeyMaterial {
        &self.public_key
    }

    /// Private half
    pub fn private_key(&self) -> &KeyMaterial {
        &self.private_key
    }

    /// When the pair was generated
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the pair should be rotated
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Configured lifetime
    pub fn rotation_interval_days(&self) -> u32 {
        self.rotation_interval_days
    }

    /// The record published to the key directory
    pub fn public_info(&self) -> PublicKeyInfo {
        PublicKeyInfo {
            key_id: self.key_id.clone(),
            public_key: self.public_key.clone(),
            expires_at: self.expires_at,
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("key_id", &self.key_id)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Public half of a key pair as published in the key directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyInfo {
    /// Key id
    pub key_id: KeyId,
    /// Public key
    pub public_key: KeyMaterial,
    /// Expiry of the key
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pair() -> KeyPair {
        KeyPair::new(
            KeyId::from_random(&[7u8; KEY_ID_BYTES]),
            KeyMaterial::rsa_public(vec![1, 2, 3]).unwrap(),
            KeyMaterial::rsa_private(vec![4, 5, 6]).unwrap(),
            time::now(),
            30,
        )
        .unwrap()
    }

    #[test]
    fn test_expiry_derived_from_interval() {
        let pair = sample_pair();
        assert_eq!(
            pair.expires_at() - pair.created_at(),
            chrono::Duration::days(30)
        );
    }

    #[test]
    fn test_key_pair_json_round_trip() {
        let pair = sample_pair();
        let json = serde_json::to_string(&pair).unwrap();
        assert!(json.contains("\"keyId\""));
        assert!(json.contains("\"rotationIntervalDays\":30"));
        assert!(json.contains("\"algorithm\":\"RSA-OAEP-256\""));

        let restored: KeyPair = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, pair);
    }

    #[test]
    fn test_rejects_inconsistent_expiry() {
        let pair = sample_pair();
        let mut value = serde_json::to_value(&pair).unwrap();
        value["expiresAt"] = serde_json::to_value(pair.created_at()).unwrap();

        let result: std::result::Result<KeyPair, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_out_of_range_interval() {
        let result = KeyPair::new(
            KeyId::parse("abc").unwrap(),
            KeyMaterial::rsa_public(vec![1]).unwrap(),
            KeyMaterial::rsa_private(vec![2]).unwrap(),
            time::now(),
            u32::MAX,
        );
        assert!(matches!(result, Err(Error::InvalidKey(_))));

        let pair = sample_pair();
        let mut value = serde_json::to_value(&pair).unwrap();
        value["rotationIntervalDays"] = serde_json::json!(u32::MAX);
        let result: std::result::Result<KeyPair, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_swapped_halves() {
        let result = KeyPair::new(
            KeyId::parse("abc").unwrap(),
            KeyMaterial::rsa_private(vec![1]).unwrap(),
            KeyMaterial::rsa_public(vec![2]).unwrap(),
            time::now(),
            30,
        );
        assert!(matches!(result, Err(Error::InvalidKey(_))));
    }

    #[test]
    fn test_rejects_malformed_material() {
        let bad = r#"{"kind":"public","algorithm":"RSA-OAEP-256","der":"%%%"}"#;
        assert!(serde_json::from_str::<KeyMaterial>(bad).is_err());

        let empty = r#"{"kind":"public","algorithm":"RSA-OAEP-256","der":""}"#;
        assert!(serde_json::from_str::<KeyMaterial>(empty).is_err());

        let unknown_alg = r#"{"kind":"public","algorithm":"DSA","der":"AQID"}"#;
        assert!(serde_json::from_str::<KeyMaterial>(unknown_alg).is_err());
    }

    #[test]
    fn test_key_id_format() {
        let id = KeyId::from_random(&[0xAB; KEY_ID_BYTES]);
        assert_eq!(id.as_str().len(), 32);
        assert!(KeyId::parse("").is_err());
        assert!(KeyId::parse("a/b").is_err());
        assert!(KeyId::parse("550e8400-e29b-41d4-a716-446655440000").is_ok());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let pair = sample_pair();
        let debug = format!("{:?} {:?}", pair, pair.private_key());
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("BAUG"));
    }
}
