//! # Cryptography Module
//!
//! Primitives and key types used by Hush Core.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    KEY HIERARCHY                                │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  Identity Key Pair (RSA-OAEP 2048, SHA-256)                    │   │
//! │  │  • rotated by the user every rotationIntervalDays             │   │
//! │  │  • wraps per-message keys                                      │   │
//! │  │                          │                                      │   │
//! │  │                          ▼                                      │   │
//! │  │  Message Key (AES-256-GCM, 32 bytes)                           │   │
//! │  │  • fresh for every payload, never reused                       │   │
//! │  │  • 96-bit IV, fresh for every payload                          │   │
//! │  │                                                                 │   │
//! │  │  Backup Key (AES-256-GCM)                                      │   │
//! │  │  • Argon2id(password, random salt)                             │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose |
//! |-----------|---------|
//! | RSA-OAEP-256 | Wrapping message keys to a recipient |
//! | AES-256-GCM | Payload and backup encryption |
//! | SHA-256 | Fingerprints |
//! | Argon2id | Backup password stretching |
//!
//! Asymmetric work and randomness go through [`PlatformCrypto`] so that each
//! host can back them with its native crypto.

mod encryption;
mod kdf;
mod keys;
mod native;
mod platform;

pub use encryption::{decrypt, encrypt, Iv, SymmetricKey, IV_SIZE, KEY_SIZE, TAG_SIZE};
pub use kdf::{derive_backup_key, SALT_SIZE};
pub use keys::{KeyAlgorithm, KeyId, KeyKind, KeyMaterial, KeyPair, PublicKeyInfo, KEY_ID_BYTES};
pub use native::NativeCrypto;
pub use platform::{GeneratedKeys, PlatformCrypto};
