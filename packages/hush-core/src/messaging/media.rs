//! Image size policy.
//!
//! Large images are shrunk before encryption to bound ciphertext size. This
//! is a transport cost policy only: the shrunk image goes through exactly the
//! same envelope protocol as any other payload.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::config::ImagePolicy;
use crate::error::{Error, Result};

const DATA_URL_SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";
const JPEG_PREFIX: &str = "data:image/jpeg;base64,";

/// Host capability that decodes, resizes and re-encodes images
#[async_trait]
pub trait ImageCodec: Send + Sync {
    /// Shrink so the long edge is at most `max_edge_px`, re-encoding as JPEG
    /// at `quality` (1-100)
    async fn downscale(&self, image: &[u8], max_edge_px: u32, quality: u8) -> Result<Vec<u8>>;
}

/// An image payload split into its optional data-URL prefix and base64 body
struct ImagePayload<'a> {
    prefix: Option<&'a str>,
    body: &'a str,
}

impl<'a> ImagePayload<'a> {
    fn parse(image: &'a str) -> Self {
        if image.starts_with(DATA_URL_SCHEME) {
            if let Some(pos) = image.find(BASE64_MARKER) {
                let split = pos + BASE64_MARKER.len();
                return Self {
                    prefix: Some(&image[..split]),
                    body: &image[split..],
                };
            }
        }
        Self {
            prefix: None,
            body: image,
        }
    }
}

/// Bring an image payload within policy, downscaling if needed
///
/// Payloads at or under the limit are returned unchanged. Without a codec an
/// oversized payload is passed through as is.
pub(crate) async fn fit_image(
    image: &str,
    policy: &ImagePolicy,
    codec: Option<&dyn ImageCodec>,
) -> Result<String> {
    let payload = ImagePayload::parse(image);
    if payload.body.len() <= policy.max_payload_base64_len {
        return Ok(image.to_string());
    }

    let codec = match codec {
        Some(codec) => codec,
        None => {
            tracing::warn!(
                payload_len = payload.body.len(),
                limit = policy.max_payload_base64_len,
                "Oversized image sent without downscaling, no codec configured"
            );
            return Ok(image.to_string());
        }
    };

    let raw = BASE64
        .decode(payload.body.trim())
        .map_err(|e| Error::ImageProcessingFailed(format!("image is not base64: {}", e)))?;
    let shrunk = codec
        .downscale(&raw, policy.max_edge_px, policy.jpeg_quality)
        .await?;
    let body = BASE64.encode(&shrunk);

    tracing::info!(
        original_len = payload.body.len(),
        downscaled_len = body.len(),
        max_edge_px = policy.max_edge_px,
        "Downscaled image before encryption"
    );

    Ok(match payload.prefix {
        Some(_) => format!("{}{}", JPEG_PREFIX, body),
        None => body,
    })
}

// ============================================================================
// TESTS
// ============================================================================
