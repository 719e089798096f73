//! Binary image sources become transportable payloads: decode, normalize
//! color mode, re-encode as JPEG, base64. Codec failures are logged and
//! degrade to "no value"; they never abort document preparation.

use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat};
use tracing::warn;

/// Encode raw image bytes into a base64 JPEG payload, or None on any failure.
pub(crate) fn encode_image_payload(bytes: &[u8]) -> Option<String> {
    let decoded = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(err) => {
            warn!("discarding image value: decode failed: {err}");
            return None;
        }
    };

    // Alpha and palette modes are collapsed to RGB before re-encoding.
    let normalized = DynamicImage::ImageRgb8(decoded.to_rgb8());

    let mut buffer = Cursor::new(Vec::new());
    if let Err(err) = normalized.write_to(&mut buffer, ImageFormat::Jpeg) {
        warn!("discarding image value: JPEG encode failed: {err}");
        return None;
    }

    Some(STANDARD.encode(buffer.into_inner()))
}
