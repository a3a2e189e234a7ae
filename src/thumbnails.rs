//! Thumbnail generation (C2): bounded-dimension JPEG previews for images,
//! single-frame extracts for videos.
//!
//! Runs inline inside the per-photo pipeline job rather than as a separate
//! batch-claim cron sweep, since every photo already gets exactly one pass
//! through the worker.

use image::{DynamicImage, ImageReader, Rgb, RgbImage};
use std::io::Cursor;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Build a thumbnail from raw file bytes. `mime_type` selects the image or
/// video path; `(width, height)` bounds the output, `quality` is the JPEG
/// quality (1-100), `ffmpeg_threads` bounds ffmpeg's decode thread count
/// for the video path.
pub async fn build_thumbnail(
    data: &[u8],
    mime_type: &str,
    width: u32,
    height: u32,
    quality: u8,
    timeout: Duration,
    ffmpeg_threads: usize,
) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
    if mime_type.starts_with("video/") {
        generate_video_thumbnail(data, width, height, quality, timeout, ffmpeg_threads).await
    } else {
        generate_image_thumbnail(data, width, height, quality)
    }
}

fn generate_image_thumbnail(
    data: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
    let orientation = read_orientation(data);
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .decode()?;

    let img = apply_orientation(img, orientation);
    let img = composite_alpha_onto_white(img);
    let thumbnail = img.thumbnail(width, height);

    let mut output = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
    thumbnail.write_with_encoder(encoder)?;

    Ok(output.into_inner())
}

fn read_orientation(data: &[u8]) -> u16 {
    exif::Reader::new()
        .read_from_container(&mut Cursor::new(data))
        .ok()
        .and_then(|exif| {
            exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
                .and_then(|f| f.value.get_uint(0))
        })
        .unwrap_or(1) as u16
}

fn apply_orientation(img: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

fn composite_alpha_onto_white(img: DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let mut out = RgbImage::new(rgba.width(), rgba.height());
        for (x, y, px) in rgba.enumerate_pixels() {
            let alpha = px[3] as f32 / 255.0;
            let blend = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)) as u8;
            out.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
        }
        DynamicImage::ImageRgb8(out)
    } else {
        img
    }
}

async fn generate_video_thumbnail(
    data: &[u8],
    width: u32,
    height: u32,
    quality: u8,
    timeout: Duration,
    ffmpeg_threads: usize,
) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
    let ffmpeg_threads = ffmpeg_threads.to_string();
    let temp_dir = std::env::temp_dir();
    let input_path = temp_dir.join(format!("photo_thumb_input_{}.tmp", rand::random::<u64>()));
    let output_path = temp_dir.join(format!("photo_thumb_output_{}.jpg", rand::random::<u64>()));

    tokio::fs::write(&input_path, data)
        .await
        .map_err(|e| format!("Failed to write temp input file {:?}: {}", input_path, e))?;

    let scale = format!("scale={}:{}:force_original_aspect_ratio=decrease", width, height);

    let run = |seek: bool| {
        let input_path = input_path.clone();
        let output_path = output_path.clone();
        let ffmpeg_threads = ffmpeg_threads.clone();
        let scale = scale.clone();
        async move {
            let mut cmd = Command::new("ffmpeg");
            cmd.args(["-hide_banner", "-loglevel", "error", "-nostdin"])
                .args(["-threads", &ffmpeg_threads]);
            if seek {
                cmd.args(["-ss", "00:00:01"]);
            }
            cmd.args(["-i", input_path.to_str().unwrap()])
                .args(["-an", "-sn"])
                .args(["-frames:v", "1"])
                .args(["-vf", &scale])
                .args(["-q:v", &quality.to_string()])
                .args(["-y", output_path.to_str().unwrap()])
                .stdout(Stdio::null())
                .stderr(Stdio::piped());
            cmd.output().await
        }
    };

    let first = tokio::time::timeout(timeout, run(true))
        .await
        .map_err(|_| "ffmpeg timed out")??;

    if !first.status.success() || !output_path.exists() {
        let stderr = String::from_utf8_lossy(&first.stderr);
        eprintln!(
            "[thumbnails] ffmpeg first attempt failed (trying without seek): {}",
            stderr
        );

        let retry = tokio::time::timeout(timeout, run(false))
            .await
            .map_err(|_| "ffmpeg retry timed out")??;

        if !retry.status.success() {
            let stderr = String::from_utf8_lossy(&retry.stderr);
            let _ = tokio::fs::remove_file(&input_path).await;
            return Err(format!("ffmpeg failed: {}", stderr).into());
        }
    }

    let thumbnail_data = tokio::fs::read(&output_path)
        .await
        .map_err(|e| format!("Failed to read ffmpeg output {:?}: {}", output_path, e))?;

    let _ = tokio::fs::remove_file(&input_path).await;
    let _ = tokio::fs::remove_file(&output_path).await;

    Ok(thumbnail_data)
}

/// Generate a random hex-suffixed thumbnail filename adjacent to the
/// original, as the blob store layout expects.
pub fn thumbnail_filename() -> String {
    format!("thumb_{:016x}.jpg", rand::random::<u64>())
}

pub fn thumbnail_path_for(group_id: i64, filename: &str) -> String {
    format!("{}/{}", group_id, filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbnail_filename_has_jpg_extension() {
        assert!(thumbnail_filename().ends_with(".jpg"));
        assert!(thumbnail_filename().starts_with("thumb_"));
    }

    #[test]
    fn thumbnail_path_is_group_scoped() {
        assert_eq!(thumbnail_path_for(7, "thumb_abc.jpg"), "7/thumb_abc.jpg");
    }

    #[test]
    fn unrecognized_orientation_is_identity() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        let out = apply_orientation(img.clone(), 1);
        assert_eq!(out.width(), img.width());
        assert_eq!(out.height(), img.height());
    }
}
