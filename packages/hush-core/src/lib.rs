//! # Hush Core
//!
//! Client-side end-to-end encryption key management for private messaging.
//! The server and transport only ever see ciphertext and public keys.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          HUSH CORE MODULES                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                          Session                                │   │
//! │  │  login ─► rotate_keys ─► send/open ─► verify ─► backup ─► logout│   │
//! │  └──────┬──────────────────┬──────────────────┬────────────────────┘   │
//! │         │                  │                  │                        │
//! │  ┌──────▼──────┐  ┌────────▼───────┐  ┌───────▼───────┐               │
//! │  │  Identity   │  │   Messaging    │  │    Storage    │               │
//! │  │             │  │                │  │               │               │
//! │  │ - KeyPair   │  │ - HybridCipher │  │ - KeyStore    │               │
//! │  │   Manager   │  │ - Envelopes    │  │ - Quarantine  │               │
//! │  │ - Finger-   │  │ - Images       │  │ - KeyValue    │               │
//! │  │   prints    │  │                │  │   Store       │               │
//! │  │ - Verify    │  │                │  │               │               │
//! │  │ - Backup    │  │                │  │               │               │
//! │  └──────┬──────┘  └────────┬───────┘  └───────────────┘               │
//! │         └──────────┬───────┘                                           │
//! │             ┌──────▼──────────────────────────────────┐                │
//! │             │                Crypto                   │                │
//! │             │  PlatformCrypto ◄── NativeCrypto        │                │
//! │             │  RSA-OAEP · AES-256-GCM · SHA-256 ·     │                │
//! │             │  Argon2id                               │                │
//! │             └─────────────────────────────────────────┘                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types and the user-facing error sanitizer
//! - [`config`] - Rotation, image and backup policy
//! - [`crypto`] - Key material and the platform crypto capability
//! - [`identity`] - Key pairs, fingerprints, verification and backups
//! - [`messaging`] - Hybrid message encryption
//! - [`storage`] - Key-value persistence and the key store
//! - [`session`] - The per-user context tying it together
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SECURITY LAYERS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Layer 1: Message Encryption (AES-256-GCM)                             │
//! │  ─────────────────────────────────────────                              │
//! │  Every message and every image gets a fresh key and a fresh IV.        │
//! │                                                                         │
//! │  Layer 2: Key Transport (RSA-OAEP, SHA-256)                            │
//! │  ──────────────────────────────────────────                             │
//! │  The message key travels wrapped under the recipient's public key.     │
//! │                                                                         │
//! │  Layer 3: Key Authenticity (Fingerprints)                              │
//! │  ─────────────────────────────────────────                              │
//! │  Users compare fingerprints out of band. Trust is recorded per key id  │
//! │  and resets whenever a contact rotates.                                │
//! │                                                                         │
//! │  Layer 4: Backups (Argon2id + AES-256-GCM)                             │
//! │  ─────────────────────────────────────────                              │
//! │  Exported key pairs are sealed under a password-derived key.           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no weaker fallback anywhere: if the platform cannot provide the
//! primitives above, private messaging is disabled for the session.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod messaging;
pub mod session;
pub mod storage;
/// UTC clock helpers.
pub mod time;

#[cfg(test)]
mod test_support;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::HushConfig;
pub use crypto::{KeyId, KeyPair, NativeCrypto, PlatformCrypto, PublicKeyInfo};
pub use error::{classify, Error, ErrorContext, Result, SanitizedError};
pub use identity::{Fingerprint, RotationStatus, VerificationStatus};
pub use messaging::{DecryptedMessage, MessagePackage, OutboundMessage};
pub use session::{KeyDirectory, LocalDirectory, MessageTransport, Session, SessionDeps};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Hush Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns build information for debugging
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        target: std::env::consts::OS,
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    }
}

/// Build information for debugging
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Crate version
    pub version: &'static str,
    /// Target operating system
    pub target: &'static str,
    /// Build profile (debug/release)
    pub profile: &'static str,
}

// ============================================================================
// TESTS
// ============================================================================
