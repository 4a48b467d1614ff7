//! # Password Key Derivation
//!
//! Turns a backup password into an AES-256-GCM key.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    BACKUP KEY DERIVATION                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Argon2id(                                                             │
//! │    password = user backup password,                                    │
//! │    salt     = 16 random bytes (stored in the blob),                    │
//! │    m, t, p  = KdfParams (stored in the blob),                          │
//! │    output   = 32 bytes                                                 │
//! │  )                                                                     │
//! │           ↓                                                             │
//! │  AES-256-GCM key                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Argon2id is memory-hard, which makes offline guessing against a stolen
//! backup expensive.

use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroizing;

use super::encryption::{SymmetricKey, KEY_SIZE};
use crate::config::KdfParams;
use crate::error::{Error, Result};

/// Salt size in bytes
pub const SALT_SIZE: usize = 16;

/// Derive a backup key from a password and salt
pub fn derive_backup_key(password: &str, salt: &[u8], params: &KdfParams) -> Result<SymmetricKey> {
    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| Error::KeyDerivationFailed(format!("invalid Argon2 parameters: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut output = Zeroizing::new([0u8; KEY_SIZE]);
    argon2
        .hash_password_into(password.as_bytes(), salt, output.as_mut())
        .map_err(|e| Error::KeyDerivationFailed(format!("Argon2 failed: {}", e)))?;

    Ok(SymmetricKey::from_bytes(*output))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cheap parameters so tests stay fast
    fn test_params() -> KdfParams {
        KdfParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_derivation_deterministic() {
        let salt = [9u8; SALT_SIZE];
        let k1 = derive_backup_key("correct horse", &salt, &test_params()).unwrap();
        let k2 = derive_backup_key("correct horse", &salt, &test_params()).unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_salt_and_password_change_key() {
        let params = test_params();
        let base = derive_backup_key("pw-one", &[1u8; SALT_SIZE], &params).unwrap();
        let other_salt = derive_backup_key("pw-one", &[2u8; SALT_SIZE], &params).unwrap();
        let other_pw = derive_backup_key("pw-two", &[1u8; SALT_SIZE], &params).unwrap();

        assert_ne!(base.as_bytes(), other_salt.as_bytes());
        assert_ne!(base.as_bytes(), other_pw.as_bytes());
    }

    #[test]
    fn test_short_salt_rejected() {
        let result = derive_backup_key("pw", &[1u8; 4], &test_params());
        assert!(matches!(result, Err(Error::KeyDerivationFailed(_))));
    }
}
