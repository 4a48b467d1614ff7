//! # Identity Module
//!
//! Lifecycle and trust of identity key pairs.
//!
//! ## Identity Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         IDENTITY SYSTEM                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────┐     │
//! │  │  KeyPairManager                                               │     │
//! │  │  ───────────────                                               │     │
//! │  │  generate(interval) ──► KeyPair { keyId, createdAt,          │     │
//! │  │                                   expiresAt, ... }            │     │
//! │  │  check_rotation_status ──► { needsRotation, daysRemaining,   │     │
//! │  │                              warningPeriod }                   │     │
//! │  │  verify / repair                                              │     │
//! │  └───────────────────────────────────────────────────────────────┘     │
//! │            │                                  │                         │
//! │            ▼                                  ▼                         │
//! │  ┌──────────────────────────┐   ┌──────────────────────────────┐       │
//! │  │  FingerprintService      │   │  BackupVault                 │       │
//! │  │  • derive(public key)    │   │  • create(pair, password)    │       │
//! │  │  • normalize / compare   │   │  • restore(blob, password)   │       │
//! │  └──────────────────────────┘   └──────────────────────────────┘       │
//! │            │                                                            │
//! │            ▼                                                            │
//! │  ┌──────────────────────────┐                                          │
//! │  │  VerificationStore       │                                          │
//! │  │  (userId, keyId) ──►     │                                          │
//! │  │    unverified | verified │                                          │
//! │  │    | mismatch            │                                          │
//! │  └──────────────────────────┘                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Rotation
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ROTATION TIMELINE                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  createdAt                           expiresAt - window    expiresAt   │
//! │      │──────────── healthy ─────────────────│── warning ──│── needs ──▶│
//! │                                                             rotation   │
//! │                                                                         │
//! │  Rotation is always started by the user. A rotated key gets a new      │
//! │  keyId, so every contact's trust in it starts again at "unverified".   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod backup;
mod fingerprint;
mod manager;
mod verification;

pub use backup::{check_password_strength, BackupBlob, BackupVault, BACKUP_VERSION};
pub use fingerprint::{Fingerprint, FingerprintService, FINGERPRINT_BYTES, FINGERPRINT_HEX_LEN};
pub use manager::{KeyPairManager, RotationStatus, VERIFICATION_PLAINTEXT};
pub use verification::{VerificationRecord, VerificationStatus, VerificationStore};
