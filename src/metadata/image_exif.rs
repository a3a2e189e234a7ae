//! Embedded EXIF parsing for JPEG/TIFF via `kamadak-exif`.
//!
//! Timestamp tag preference mirrors the original extractor: `DateTimeOriginal`
//! first, falling back to `DateTime`, in the EXIF format `YYYY:MM:DD HH:MM:SS`.
//! GPS tags are converted from degrees/minutes/seconds plus a hemisphere
//! reference into signed decimal degrees.

use chrono::{NaiveDateTime, TimeZone, Utc};
use exif::{In, Reader, Tag, Value};
use std::io::Cursor;

use super::Extracted;

const TIMESTAMP_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

pub fn extract_from_bytes(data: &[u8]) -> Extracted {
    let exif = match Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => exif,
        Err(e) => {
            eprintln!("[metadata] exif parse failed: {}", e);
            return Extracted::empty();
        }
    };

    let shot_at = read_timestamp(&exif, Tag::DateTimeOriginal)
        .or_else(|| read_timestamp(&exif, Tag::DateTime));

    let gps = read_gps(&exif);

    let raw = raw_fields(&exif);

    Extracted { shot_at, gps, raw }
}

fn read_timestamp(exif: &exif::Exif, tag: Tag) -> Option<chrono::DateTime<Utc>> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let text = field.display_value().to_string();
    let naive = NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT).ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

fn read_gps(exif: &exif::Exif) -> Option<(f64, f64)> {
    let lat_dms = dms_value(exif, Tag::GPSLatitude)?;
    let lat_ref = ref_value(exif, Tag::GPSLatitudeRef)?;
    let lon_dms = dms_value(exif, Tag::GPSLongitude)?;
    let lon_ref = ref_value(exif, Tag::GPSLongitudeRef)?;

    let mut lat = dms_to_decimal(lat_dms);
    if lat_ref == "S" {
        lat = -lat;
    }
    let mut lon = dms_to_decimal(lon_dms);
    if lon_ref == "W" {
        lon = -lon;
    }
    Some((lat, lon))
}

fn dms_value(exif: &exif::Exif, tag: Tag) -> Option<[f64; 3]> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Rational(values) if values.len() == 3 => Some([
            values[0].to_f64(),
            values[1].to_f64(),
            values[2].to_f64(),
        ]),
        _ => None,
    }
}

fn ref_value(exif: &exif::Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    Some(field.display_value().to_string())
}

fn dms_to_decimal(dms: [f64; 3]) -> f64 {
    dms[0] + dms[1] / 60.0 + dms[2] / 3600.0
}

fn raw_fields(exif: &exif::Exif) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for field in exif.fields() {
        map.insert(
            field.tag.to_string(),
            serde_json::Value::String(field.display_value().to_string()),
        );
    }
    serde_json::Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dms_conversion_matches_known_point() {
        // 37 degrees, 48 minutes, 52.8 seconds ~= 37.8147 decimal degrees
        let decimal = dms_to_decimal([37.0, 48.0, 52.8]);
        assert!((decimal - 37.8147).abs() < 1e-3);
    }

    #[test]
    fn garbage_bytes_are_tolerated() {
        let result = extract_from_bytes(b"not a real jpeg");
        assert_eq!(result.shot_at, None);
        assert_eq!(result.gps, None);
    }
}
