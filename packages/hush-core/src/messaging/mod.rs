//! # Messaging Module
//!
//! Hybrid encryption of text and image payloads for a single recipient.
//!
//! ## Message Encryption Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MESSAGE ENCRYPTION                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Sender (Alice)                                                        │
//! │  ─────────────────────────────────────────────────────────────         │
//! │                                                                         │
//! │  Input: "Hello Bob!", Bob's public key from the directory             │
//! │                                                                         │
//! │  1. Fresh message key and IV                                           │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  key = random 32 bytes     iv = random 12 bytes            │       │
//! │  │  (both single-use, never shared with another payload)      │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  2. Encrypt payload                                                    │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  AES-256-GCM(key, iv, "Hello Bob!")                        │       │
//! │  │  → ciphertext + 16-byte auth tag                          │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  3. Wrap message key                                                   │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  RSA-OAEP-SHA256(bob_public, key) → wrappedSymmetricKey    │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  Output: Envelope { ciphertext, wrappedSymmetricKey, iv }             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Decryption runs the same steps backwards with Bob's private key. Any
//! failure along the way (wrong key, flipped byte, truncated field) yields
//! [`Error::DecryptionFailed`](crate::Error::DecryptionFailed) and never a
//! partial plaintext.
//!
//! ## Wire Protocol
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MESSAGE PACKAGE FORMAT                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  OutboundMessage (JSON, handed to the transport)                       │
//! │  {                                                                      │
//! │    "encryptedContent": Envelope,     // text payload                   │
//! │    "encryptedImageData": Envelope,   // optional, own key + IV         │
//! │    "expiresInMinutes": 60,           // optional                       │
//! │    "recipientId": "bob",                                               │
//! │    "senderKeyId": "9f86d081884c7d65..."                                │
//! │  }                                                                      │
//! │                                                                         │
//! │  Envelope                                                              │
//! │  {                                                                      │
//! │    "ciphertext": "base64...",                                          │
//! │    "wrappedSymmetricKey": "base64...",                                 │
//! │    "iv": "base64..."                                                   │
//! │  }                                                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cipher;
mod media;

pub use cipher::HybridCipher;
pub use media::ImageCodec;

use serde::{Deserialize, Serialize};

use crate::crypto::KeyId;
use crate::error::Result;

/// One payload encrypted for one recipient key
///
/// All fields are standard base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// AES-256-GCM ciphertext with appended tag
    pub ciphertext: String,
    /// Message key encrypted to the recipient
    pub wrapped_symmetric_key: String,
    /// 96-bit IV
    pub iv: String,
}

impl Envelope {
    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Text envelope plus optional image envelope and expiry
///
/// The two envelopes are independent encryptions, each under its own key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePackage {
    /// Encrypted text
    pub content_envelope: Envelope,
    /// Encrypted image, if one was attached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_envelope: Option<Envelope>,
    /// Disappearing-message timer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in_minutes: Option<u32>,
}

impl MessagePackage {
    /// Address the package for the transport
    pub fn into_outbound(self, recipient_id: impl Into<String>, sender_key_id: KeyId) -> OutboundMessage {
        OutboundMessage {
            encrypted_content: self.content_envelope,
            encrypted_image_data: self.image_envelope,
            expires_in_minutes: self.expires_in_minutes,
            recipient_id: recipient_id.into(),
            sender_key_id,
        }
    }
}

/// What the transport collaborator receives
///
/// The transport never decrypts or inspects any field besides the routing
/// ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    /// Encrypted text
    pub encrypted_content: Envelope,
    /// Encrypted image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_image_data: Option<Envelope>,
    /// Disappearing-message timer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in_minutes: Option<u32>,
    /// Who the message is for
    pub recipient_id: String,
    /// Key id of the sender at send time
    pub sender_key_id: KeyId,
}

impl OutboundMessage {
    /// The cryptographic part of the message
    pub fn package(&self) -> MessagePackage {
        MessagePackage {
            content_envelope: self.encrypted_content.clone(),
            image_envelope: self.encrypted_image_data.clone(),
            expires_in_minutes: self.expires_in_minutes,
        }
    }
}

/// A decrypted [`MessagePackage`]
#[derive(Clone, PartialEq, Eq)]
pub struct DecryptedMessage {
    /// Plaintext
    pub content: String,
    /// Image payload (base64 or data URL), if present
    pub image: Option<String>,
    /// Disappearing-message timer
    pub expires_in_minutes: Option<u32>,
}

impl std::fmt::Debug for DecryptedMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedMessage")
            .field("content_len", &self.content.len())
            .field("has_image", &self.image.is_some())
            .field("expires_in_minutes", &self.expires_in_minutes)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(tag: &str) -> Envelope {
        Envelope {
            ciphertext: format!("{}-ct", tag),
            wrapped_symmetric_key: format!("{}-wk", tag),
            iv: format!("{}-iv", tag),
        }
    }

    #[test]
    fn test_envelope_wire_names() {
        let json = envelope("a").to_json().unwrap();
        assert!(json.contains("\"wrappedSymmetricKey\""));
        assert!(json.contains("\"iv\""));
        assert_eq!(Envelope::from_json(&json).unwrap(), envelope("a"));
    }

    #[test]
    fn test_outbound_omits_missing_optionals() {
        let package = MessagePackage {
            content_envelope: envelope("c"),
            image_envelope: None,
            expires_in_minutes: None,
        };
        let outbound = package.into_outbound("bob", KeyId::parse("k1").unwrap());
        let json = serde_json::to_string(&outbound).unwrap();

        assert!(json.contains("\"encryptedContent\""));
        assert!(json.contains("\"recipientId\":\"bob\""));
        assert!(json.contains("\"senderKeyId\":\"k1\""));
        assert!(!json.contains("encryptedImageData"));
        assert!(!json.contains("expiresInMinutes"));
    }

    #[test]
    fn test_outbound_package_round_trip() {
        let package = MessagePackage {
            content_envelope: envelope("c"),
            image_envelope: Some(envelope("i")),
            expires_in_minutes: Some(60),
        };
        let outbound = package.clone().into_outbound("bob", KeyId::parse("k1").unwrap());
        assert_eq!(outbound.package(), package);
    }

    #[test]
    fn test_decrypted_message_debug_hides_content() {
        let message = DecryptedMessage {
            content: "top secret".into(),
            image: None,
            expires_in_minutes: None,
        };
        assert!(!format!("{:?}", message).contains("top secret"));
    }
}
