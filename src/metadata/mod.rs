//! Metadata extraction (C1): pull a capture timestamp and GPS point out of
//! a photo or video file, tolerating missing or malformed fields.

pub mod external_probe;
pub mod image_exif;

use chrono::{DateTime, Utc};

/// Result of probing a single file. Every field is best-effort; a probe
/// must never fail the surrounding job over a missing or malformed tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    pub shot_at: Option<DateTime<Utc>>,
    pub gps: Option<(f64, f64)>,
    pub raw: serde_json::Value,
}

impl Extracted {
    pub fn empty() -> Self {
        Extracted {
            shot_at: None,
            gps: None,
            raw: serde_json::Value::Object(Default::default()),
        }
    }
}

/// Route raw file bytes to the embedded reader or the external subprocess
/// tool by mime type. Mirrors the thumbnail builder's pattern of operating
/// on already-downloaded bytes rather than re-reading from the blob store.
pub async fn extract(data: &[u8], mime_type: &str, timeout: std::time::Duration) -> Extracted {
    if is_embedded_exif_format(mime_type) {
        image_exif::extract_from_bytes(data)
    } else {
        external_probe::extract_via_exiftool(data, mime_type, timeout).await
    }
}

fn is_embedded_exif_format(mime_type: &str) -> bool {
    matches!(
        mime_type,
        "image/jpeg" | "image/jpg" | "image/tiff" | "image/png"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_jpeg_to_embedded_reader() {
        assert!(is_embedded_exif_format("image/jpeg"));
        assert!(is_embedded_exif_format("image/png"));
        assert!(!is_embedded_exif_format("video/mp4"));
        assert!(!is_embedded_exif_format("image/heic"));
    }
}
