//! Metadata extraction for formats the embedded reader can't handle
//! (HEIC, video containers), delegated to `exiftool` as a bounded-timeout
//! subprocess.
//!
//! Tag preference order mirrors the original extractor: video files prefer
//! `DateTimeOriginal`, then `CreateDate`, then `MediaCreateDate`; HEIC files
//! prefer `DateTimeOriginal`, then `CreateDate`, then `DateCreated`.

use chrono::{NaiveDateTime, TimeZone, Utc};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::Extracted;

const TIMESTAMP_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

const VIDEO_TAG_ORDER: &[&str] = &["DateTimeOriginal", "CreateDate", "MediaCreateDate"];
const HEIC_TAG_ORDER: &[&str] = &["DateTimeOriginal", "CreateDate", "DateCreated"];

/// Write `data` to a temp file (exiftool needs a path, not a stream) and
/// run it through exiftool, cleaning up the temp file regardless of
/// outcome. Mirrors the thumbnail builder's temp-input-file pattern for
/// its video/ffmpeg path.
pub async fn extract_via_exiftool(data: &[u8], mime_type: &str, timeout: Duration) -> Extracted {
    let is_heic = mime_type.eq_ignore_ascii_case("image/heic")
        || mime_type.eq_ignore_ascii_case("image/heif");
    let tag_order = if is_heic { HEIC_TAG_ORDER } else { VIDEO_TAG_ORDER };

    let temp_dir = std::env::temp_dir();
    let input_path = temp_dir.join(format!("photo_probe_{}.tmp", rand::random::<u64>()));
    if let Err(e) = tokio::fs::write(&input_path, data).await {
        eprintln!("[metadata] failed to write temp probe file: {}", e);
        return Extracted::empty();
    }

    let result = tokio::time::timeout(timeout, run_exiftool(&input_path)).await;
    let _ = tokio::fs::remove_file(&input_path).await;

    let output = match result {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            eprintln!("[metadata] exiftool failed: {}", e);
            return Extracted::empty();
        }
        Err(_) => {
            eprintln!("[metadata] exiftool timed out");
            return Extracted::empty();
        }
    };

    parse_exiftool_json(&output, tag_order)
}

async fn run_exiftool(path: &std::path::Path) -> Result<Vec<u8>, std::io::Error> {
    let output = Command::new("exiftool")
        .args(["-json", "-n", "-GPSLatitude", "-GPSLongitude"])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(std::io::Error::other(format!(
            "exiftool exited with {}: {}",
            output.status, stderr
        )));
    }
    Ok(output.stdout)
}

fn parse_exiftool_json(stdout: &[u8], tag_order: &[&str]) -> Extracted {
    let parsed: serde_json::Value = match serde_json::from_slice(stdout) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("[metadata] exiftool produced unparseable JSON: {}", e);
            return Extracted::empty();
        }
    };

    let entry = match parsed.as_array().and_then(|arr| arr.first()) {
        Some(entry) => entry.clone(),
        None => return Extracted::empty(),
    };

    let shot_at = tag_order
        .iter()
        .find_map(|tag| entry.get(tag).and_then(|v| v.as_str()))
        .and_then(|text| NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok())
        .map(|naive| Utc.from_utc_datetime(&naive));

    let gps = match (
        entry.get("GPSLatitude").and_then(|v| v.as_f64()),
        entry.get("GPSLongitude").and_then(|v| v.as_f64()),
    ) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => None,
    };

    Extracted {
        shot_at,
        gps,
        raw: entry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_prefers_datetime_original_over_create_date() {
        let json = br#"[{"DateTimeOriginal":"2025:06:10 09:00:00","CreateDate":"2025:06:11 09:00:00"}]"#;
        let result = parse_exiftool_json(json, VIDEO_TAG_ORDER);
        assert_eq!(
            result.shot_at,
            Some(Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn falls_back_to_create_date_when_original_missing() {
        let json = br#"[{"CreateDate":"2025:06:11 09:00:00","MediaCreateDate":"2025:06:12 09:00:00"}]"#;
        let result = parse_exiftool_json(json, VIDEO_TAG_ORDER);
        assert_eq!(
            result.shot_at,
            Some(Utc.with_ymd_and_hms(2025, 6, 11, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn missing_tags_yield_none_not_an_error() {
        let json = br#"[{}]"#;
        let result = parse_exiftool_json(json, VIDEO_TAG_ORDER);
        assert_eq!(result.shot_at, None);
        assert_eq!(result.gps, None);
    }

    #[test]
    fn gps_reads_as_decimal_pair() {
        let json = br#"[{"GPSLatitude":37.8147,"GPSLongitude":-122.4789}]"#;
        let result = parse_exiftool_json(json, VIDEO_TAG_ORDER);
        assert_eq!(result.gps, Some((37.8147, -122.4789)));
    }
}
