//! # Error Handling
//!
//! Error types for Hush Core, and the sanitizer that turns them into
//! user-facing classifications.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Session Errors (100)                                              │
//! │  │   ├── NotLoggedIn           - No session for this operation         │
//! │  │   ├── MessagingDisabled     - Platform crypto unavailable           │
//! │  │   └── NoKeyPair             - Session has no identity keys yet      │
//! │  │                                                                      │
//! │  ├── Key Errors (200)                                                  │
//! │  │   ├── KeyGenerationFailed   - Platform refused to generate keys     │
//! │  │   ├── PlatformUnavailable   - No usable crypto on this host         │
//! │  │   ├── KeyVerificationFailed - Self-test round trip failed           │
//! │  │   ├── KeyRepairFailed       - Stored record cannot be repaired      │
//! │  │   └── InvalidKey            - Malformed key material                │
//! │  │                                                                      │
//! │  ├── Crypto Errors (300)                                               │
//! │  │   ├── EncryptionFailed      - Wrap or encrypt step failed           │
//! │  │   ├── DecryptionFailed      - Unwrap or decrypt step failed         │
//! │  │   ├── KeyDerivationFailed   - Password KDF failed                   │
//! │  │   └── RngFailed             - Random generation failed              │
//! │  │                                                                      │
//! │  ├── Fingerprint Errors (400)                                          │
//! │  ├── Backup Errors (500)                                               │
//! │  ├── Storage Errors (600)                                              │
//! │  ├── Collaborator Errors (700)                                         │
//! │  └── Internal Errors (900)                                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sanitization
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      ERROR SURFACING FLOW                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Internal (Rust)            classify()                 UI / support    │
//! │  ──────────────────────────────────────────────────────────────────     │
//! │                                                                         │
//! │  Result<T, Error>  ──────►  SanitizedError  ──────►  code + message    │
//! │                             + error_id               + user action     │
//! │                                                                         │
//! │  The raw error text stays inside the process. Only the stable code     │
//! │  and the correlation id are logged.                                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for Hush Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Hush Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Session Errors (100-199)
    // ========================================================================
    /// No session is active
    #[error("No active session. Log in first.")]
    NotLoggedIn,

    /// Private messaging is disabled for this session
    #[error("Private messaging is disabled: {0}")]
    MessagingDisabled(String),

    /// The session has no identity key pair
    #[error("No key pair loaded. Generate keys first.")]
    NoKeyPair,

    // ========================================================================
    // Key Errors (200-299)
    // ========================================================================
    /// The platform failed to generate a key pair
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// The platform has no usable cryptography
    #[error("Platform cryptography unavailable: {0}")]
    PlatformUnavailable(String),

    /// Encrypt-then-decrypt self test failed
    #[error("Key pair verification failed: {0}")]
    KeyVerificationFailed(String),

    /// A stored key record could not be repaired
    #[error("Stored key pair cannot be repaired; new keys must be generated")]
    KeyRepairFailed,

    /// Invalid key format or length
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // ========================================================================
    // Crypto Errors (300-399)
    // ========================================================================
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Key derivation failed
    #[error("Failed to derive key: {0}")]
    KeyDerivationFailed(String),

    /// Random number generation failed
    #[error("Random number generation failed")]
    RngFailed,

    // ========================================================================
    // Fingerprint Errors (400-499)
    // ========================================================================
    /// A fingerprint could not be derived or parsed
    #[error("Invalid fingerprint: {0}")]
    FingerprintInvalid(String),

    // ========================================================================
    // Backup Errors (500-599)
    // ========================================================================
    /// Backup creation failed
    #[error("Backup creation failed: {0}")]
    BackupCreateFailed(String),

    /// The backup password does not meet the strength policy
    #[error("Backup password too weak: {0}")]
    WeakBackupPassword(String),

    /// Wrong password or corrupted backup. Deliberately carries no detail.
    #[error("Backup could not be restored")]
    BackupRestoreFailed,

    /// The backup text could not be parsed
    #[error("Invalid backup format: {0}")]
    InvalidBackupFormat(String),

    // ========================================================================
    // Storage Errors (600-699)
    // ========================================================================
    /// Failed to read from storage
    #[error("Failed to read from storage: {0}")]
    StorageReadError(String),

    /// Failed to write to storage
    #[error("Failed to write to storage: {0}")]
    StorageWriteError(String),

    /// A stored record was malformed and has been quarantined
    #[error("Stored record corrupted and quarantined: {0}")]
    StorageCorrupted(String),

    // ========================================================================
    // Collaborator Errors (700-799)
    // ========================================================================
    /// The public-key directory failed
    #[error("Key directory error: {0}")]
    DirectoryError(String),

    /// The directory has no key for the recipient
    #[error("No public key published for {0}")]
    RecipientKeyNotFound(String),

    /// The message transport failed
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The image codec failed
    #[error("Image processing failed: {0}")]
    ImageProcessingFailed(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================
    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Numeric error code
    ///
    /// - 100-199: Session
    /// - 200-299: Keys
    /// - 300-399: Crypto
    /// - 400-499: Fingerprints
    /// - 500-599: Backup
    /// - 600-699: Storage
    /// - 700-799: Collaborators
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            Error::NotLoggedIn => 100,
            Error::MessagingDisabled(_) => 101,
            Error::NoKeyPair => 102,

            Error::KeyGenerationFailed(_) => 200,
            Error::PlatformUnavailable(_) => 201,
            Error::KeyVerificationFailed(_) => 202,
            Error::KeyRepairFailed => 203,
            Error::InvalidKey(_) => 204,

            Error::EncryptionFailed(_) => 300,
            Error::DecryptionFailed(_) => 301,
            Error::KeyDerivationFailed(_) => 302,
            Error::RngFailed => 303,

            Error::FingerprintInvalid(_) => 400,

            Error::BackupCreateFailed(_) => 500,
            Error::WeakBackupPassword(_) => 501,
            Error::BackupRestoreFailed => 502,
            Error::InvalidBackupFormat(_) => 503,

            Error::StorageReadError(_) => 600,
            Error::StorageWriteError(_) => 601,
            Error::StorageCorrupted(_) => 602,

            Error::DirectoryError(_) => 700,
            Error::RecipientKeyNotFound(_) => 701,
            Error::TransportError(_) => 702,
            Error::ImageProcessingFailed(_) => 703,

            Error::Internal(_) => 900,
            Error::SerializationError(_) => 901,
        }
    }

    /// Whether retrying the same call can change the outcome
    ///
    /// Cryptographic failures are deterministic for identical inputs and are
    /// never retryable. Only collaborator I/O is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::DirectoryError(_)
                | Error::TransportError(_)
                | Error::StorageReadError(_)
                | Error::StorageWriteError(_)
        )
    }

    /// Whether this error must switch private messaging off entirely
    pub fn is_fatal_for_messaging(&self) -> bool {
        matches!(self, Error::PlatformUnavailable(_))
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::StorageReadError(err.to_string())
    }
}

// ============================================================================
// SANITIZER
// ============================================================================

/// Where an error surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorContext {
    /// Generating or rotating identity keys
    KeyGeneration,
    /// Self-testing a key pair
    KeyVerification,
    /// Encrypting a message or image
    Encryption,
    /// Decrypting a message or image
    Decryption,
    /// Deriving or comparing fingerprints
    Fingerprint,
    /// Creating a backup
    BackupCreate,
    /// Restoring a backup
    BackupRestore,
    /// Local persistence
    Storage,
    /// Public-key directory lookups and publication
    Directory,
}

impl ErrorContext {
    /// Stable label used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorContext::KeyGeneration => "key_generation",
            ErrorContext::KeyVerification => "key_verification",
            ErrorContext::Encryption => "encryption",
            ErrorContext::Decryption => "decryption",
            ErrorContext::Fingerprint => "fingerprint",
            ErrorContext::BackupCreate => "backup_create",
            ErrorContext::BackupRestore => "backup_restore",
            ErrorContext::Storage => "storage",
            ErrorContext::Directory => "directory",
        }
    }
}

/// Stable, user-facing error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Keys could not be generated
    KeyGenerationFailed,
    /// The stored key pair failed its self test
    KeyVerificationFailed,
    /// A message could not be encrypted
    EncryptionFailed,
    /// A message could not be decrypted
    DecryptionFailed,
    /// A fingerprint was malformed
    FingerprintInvalid,
    /// A backup could not be created
    BackupCreateFailed,
    /// The backup password was rejected by the strength policy
    WeakPassword,
    /// A backup could not be restored
    BackupRestoreFailed,
    /// The recipient has no published key
    RecipientKeyMissing,
    /// Private messaging is switched off
    MessagingDisabled,
    /// Anything unrecognized
    UnknownError,
}

impl ErrorCode {
    /// The wire form of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::KeyGenerationFailed => "KEY_GENERATION_FAILED",
            ErrorCode::KeyVerificationFailed => "KEY_VERIFICATION_FAILED",
            ErrorCode::EncryptionFailed => "ENCRYPTION_FAILED",
            ErrorCode::DecryptionFailed => "DECRYPTION_FAILED",
            ErrorCode::FingerprintInvalid => "FINGERPRINT_INVALID",
            ErrorCode::BackupCreateFailed => "BACKUP_CREATE_FAILED",
            ErrorCode::WeakPassword => "WEAK_PASSWORD",
            ErrorCode::BackupRestoreFailed => "BACKUP_RESTORE_FAILED",
            ErrorCode::RecipientKeyMissing => "RECIPIENT_KEY_MISSING",
            ErrorCode::MessagingDisabled => "MESSAGING_DISABLED",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ErrorCode::KeyGenerationFailed => "Your encryption keys could not be created.",
            ErrorCode::KeyVerificationFailed => "Your encryption keys failed a safety check.",
            ErrorCode::EncryptionFailed => "This message could not be encrypted.",
            ErrorCode::DecryptionFailed => "This message cannot be decrypted.",
            ErrorCode::FingerprintInvalid => "That security code is not valid.",
            ErrorCode::BackupCreateFailed => "The key backup could not be created.",
            ErrorCode::WeakPassword => "That backup password is too weak.",
            ErrorCode::BackupRestoreFailed => {
                "The backup could not be restored. Check the password and the backup file."
            }
            ErrorCode::RecipientKeyMissing => "This contact has not set up private messaging yet.",
            ErrorCode::MessagingDisabled => {
                "Private messaging is not available on this device."
            }
            ErrorCode::UnknownError => "Something went wrong.",
        }
    }

    fn user_action(&self) -> &'static str {
        match self {
            ErrorCode::KeyGenerationFailed => "Try again, or use a browser or device with secure cryptography support.",
            ErrorCode::KeyVerificationFailed => "Regenerate your keys.",
            ErrorCode::EncryptionFailed => "Ask the contact to regenerate their keys, then resend.",
            ErrorCode::DecryptionFailed => "Ask the sender to resend the message.",
            ErrorCode::FingerprintInvalid => "Re-enter the code exactly as your contact shows it.",
            ErrorCode::BackupCreateFailed => "Try creating the backup again.",
            ErrorCode::WeakPassword => "Choose a longer, less predictable password.",
            ErrorCode::BackupRestoreFailed => "Re-enter the password or choose another backup.",
            ErrorCode::RecipientKeyMissing => "Ask the contact to open private messaging once.",
            ErrorCode::MessagingDisabled => "Update your browser or device and sign in again.",
            ErrorCode::UnknownError => "Contact support with the error id.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A leak-free classification of an internal failure
///
/// Safe to show to users and to hand to support tooling.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedError {
    /// Stable code
    pub code: ErrorCode,
    /// Safe user-facing text
    pub message: &'static str,
    /// What the user should do next
    pub user_action: &'static str,
    /// Random correlation id
    pub error_id: Uuid,
}

impl SanitizedError {
    fn new(code: ErrorCode, context: ErrorContext) -> Self {
        let sanitized = Self {
            code,
            message: code.message(),
            user_action: code.user_action(),
            error_id: Uuid::new_v4(),
        };
        tracing::warn!(
            error_id = %sanitized.error_id,
            code = code.as_str(),
            context = context.as_str(),
            "operation failed"
        );
        sanitized
    }
}

impl fmt::Display for SanitizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, ref {})", self.message, self.code, self.error_id)
    }
}

/// Classify an internal error into a stable, leak-free code
pub fn classify(error: &Error, context: ErrorContext) -> SanitizedError {
    let code = match error {
        Error::KeyGenerationFailed(_) | Error::PlatformUnavailable(_)
            if context == ErrorContext::KeyGeneration =>
        {
            ErrorCode::KeyGenerationFailed
        }
        Error::PlatformUnavailable(_) | Error::MessagingDisabled(_) => {
            ErrorCode::MessagingDisabled
        }
        Error::KeyGenerationFailed(_) => ErrorCode::KeyGenerationFailed,
        Error::KeyVerificationFailed(_) | Error::KeyRepairFailed => {
            ErrorCode::KeyVerificationFailed
        }
        Error::EncryptionFailed(_) => ErrorCode::EncryptionFailed,
        Error::DecryptionFailed(_) => ErrorCode::DecryptionFailed,
        Error::InvalidKey(_) if context == ErrorContext::Encryption => {
            ErrorCode::EncryptionFailed
        }
        Error::InvalidKey(_) if context == ErrorContext::Decryption => {
            ErrorCode::DecryptionFailed
        }
        Error::FingerprintInvalid(_) => ErrorCode::FingerprintInvalid,
        Error::WeakBackupPassword(_) => ErrorCode::WeakPassword,
        Error::BackupCreateFailed(_) => ErrorCode::BackupCreateFailed,
        Error::BackupRestoreFailed | Error::InvalidBackupFormat(_) => {
            ErrorCode::BackupRestoreFailed
        }
        Error::RecipientKeyNotFound(_) => ErrorCode::RecipientKeyMissing,
        _ => ErrorCode::UnknownError,
    };
    SanitizedError::new(code, context)
}

/// Classify raw error text raised by a host platform
///
/// Matches a small set of known failure signatures; everything else is
/// `UNKNOWN_ERROR`.
pub fn classify_message(raw: &str, context: ErrorContext) -> SanitizedError {
    let lower = raw.to_ascii_lowercase();
    let failed = lower.contains("fail") || lower.contains("error");

    let code = if (lower.contains("wrap") || lower.contains("encrypt"))
        && !lower.contains("unwrap")
        && !lower.contains("decrypt")
        && failed
    {
        ErrorCode::EncryptionFailed
    } else if (lower.contains("unwrap") || lower.contains("decrypt")) && failed {
        ErrorCode::DecryptionFailed
    } else if lower.contains("operationerror") {
        match context {
            ErrorContext::Encryption => ErrorCode::EncryptionFailed,
            ErrorContext::BackupRestore => ErrorCode::BackupRestoreFailed,
            _ => ErrorCode::DecryptionFailed,
        }
    } else if lower.contains("generatekey") || lower.contains("key generation") {
        ErrorCode::KeyGenerationFailed
    } else if lower.contains("password") && context == ErrorContext::BackupRestore {
        ErrorCode::BackupRestoreFailed
    } else {
        ErrorCode::UnknownError
    };
    SanitizedError::new(code, context)
}

// ============================================================================
// TESTS
// ============================================================================
