//! Process-wide configuration, parsed once from the environment at startup.
//!
//! No other module reads `std::env` directly (outside this file and the two
//! `main`s that construct a `Settings`). Required variables panic with a
//! descriptive message if absent; optional variables fall back to documented
//! defaults, with documented floors enforced here so a misconfigured value
//! is visible at startup instead of silently clamped later.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_THUMBNAIL_WIDTH: u32 = 512;
const DEFAULT_THUMBNAIL_HEIGHT: u32 = 512;
const DEFAULT_THUMBNAIL_QUALITY: u8 = 85;
const DEFAULT_MEETING_GAP_HOURS: i64 = 18;
const DEFAULT_CLUSTER_DEBOUNCE_TTL_SECS: u64 = 5;
const CLUSTER_DEBOUNCE_TTL_FLOOR_SECS: u64 = 5;
const DEFAULT_CLUSTER_RETRY_DELAY_SECS: u64 = 3;
const CLUSTER_RETRY_DELAY_FLOOR_SECS: u64 = 3;
const DEFAULT_CLUSTER_MAX_RETRIES: u32 = 3;
const DEFAULT_METADATA_TIMEOUT_SECS: u64 = 15;
const DEFAULT_THUMBNAIL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DB_POOL_SIZE: u32 = 25;
const DEFAULT_WORKER_CONCURRENCY: usize = 12;
const DEFAULT_FFMPEG_THREADS: usize = 1;

/// Process-wide settings, constructed once and passed by `Arc` to every
/// component that needs it rather than read ambiently.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub upload_dir: Option<PathBuf>,
    pub gcs_bucket: String,

    pub meeting_gap: Duration,
    pub cluster_debounce_ttl: Duration,
    pub cluster_retry_delay: Duration,
    pub cluster_max_retries: u32,
    pub enable_clustering_metrics: bool,

    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub thumbnail_quality: u8,

    pub metadata_timeout: Duration,
    pub thumbnail_timeout: Duration,

    pub db_pool_size: u32,
    pub worker_concurrency: usize,
    pub ffmpeg_threads: usize,
}

impl Settings {
    /// Parse settings from the process environment. Panics with a
    /// descriptive message if a required variable is absent or a floor is
    /// violated.
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL environment variable must be set");

        let redis_url = std::env::var("REDIS_URL").ok().or_else(|| {
            let host = std::env::var("REDIS_HOST").ok()?;
            let port = std::env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());
            let db = std::env::var("REDIS_DB").unwrap_or_else(|_| "0".to_string());
            Some(format!("redis://{}:{}/{}", host, port, db))
        });

        let upload_dir = std::env::var("UPLOAD_DIR").ok().map(PathBuf::from);
        let gcs_bucket =
            std::env::var("GCS_BUCKET_NAME").unwrap_or_else(|_| "photo_pipeline_data".to_string());

        let meeting_gap_hours = env_parse("MEETING_GAP_HOURS", DEFAULT_MEETING_GAP_HOURS);
        if meeting_gap_hours <= 0 {
            panic!("MEETING_GAP_HOURS must be positive, got {}", meeting_gap_hours);
        }

        let debounce_ttl_secs =
            env_parse("CLUSTER_DEBOUNCE_TTL", DEFAULT_CLUSTER_DEBOUNCE_TTL_SECS);
        if debounce_ttl_secs < CLUSTER_DEBOUNCE_TTL_FLOOR_SECS {
            panic!(
                "CLUSTER_DEBOUNCE_TTL must be at least {}s, got {}s",
                CLUSTER_DEBOUNCE_TTL_FLOOR_SECS, debounce_ttl_secs
            );
        }

        let retry_delay_secs =
            env_parse("CLUSTER_RETRY_DELAY", DEFAULT_CLUSTER_RETRY_DELAY_SECS);
        if retry_delay_secs < CLUSTER_RETRY_DELAY_FLOOR_SECS {
            panic!(
                "CLUSTER_RETRY_DELAY must be at least {}s, got {}s",
                CLUSTER_RETRY_DELAY_FLOOR_SECS, retry_delay_secs
            );
        }

        let cluster_max_retries = env_parse("CLUSTER_MAX_RETRIES", DEFAULT_CLUSTER_MAX_RETRIES);

        let enable_clustering_metrics = std::env::var("ENABLE_CLUSTERING_METRICS")
            .ok()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        let (thumb_w, thumb_h) = parse_thumbnail_size();
        let thumbnail_quality = env_parse("THUMBNAIL_QUALITY", DEFAULT_THUMBNAIL_QUALITY);

        let metadata_timeout_secs =
            env_parse("METADATA_TIMEOUT_SECS", DEFAULT_METADATA_TIMEOUT_SECS);
        let thumbnail_timeout_secs =
            env_parse("THUMBNAIL_TIMEOUT_SECS", DEFAULT_THUMBNAIL_TIMEOUT_SECS);

        let db_pool_size = env_parse("DB_POOL_SIZE", DEFAULT_DB_POOL_SIZE);
        let worker_concurrency = env_parse("WORKER_CONCURRENCY", DEFAULT_WORKER_CONCURRENCY);
        let ffmpeg_threads: usize = env_parse("FFMPEG_THREADS", DEFAULT_FFMPEG_THREADS);
        let ffmpeg_threads = if ffmpeg_threads > 0 {
            ffmpeg_threads
        } else {
            DEFAULT_FFMPEG_THREADS
        };

        Settings {
            database_url,
            redis_url,
            upload_dir,
            gcs_bucket,
            meeting_gap: Duration::from_secs((meeting_gap_hours as u64) * 3600),
            cluster_debounce_ttl: Duration::from_secs(debounce_ttl_secs),
            cluster_retry_delay: Duration::from_secs(retry_delay_secs),
            cluster_max_retries,
            enable_clustering_metrics,
            thumbnail_width: thumb_w,
            thumbnail_height: thumb_h,
            thumbnail_quality,
            metadata_timeout: Duration::from_secs(metadata_timeout_secs),
            thumbnail_timeout: Duration::from_secs(thumbnail_timeout_secs),
            db_pool_size,
            worker_concurrency,
            ffmpeg_threads,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn parse_thumbnail_size() -> (u32, u32) {
    match std::env::var("THUMBNAIL_SIZE") {
        Ok(raw) => {
            let mut parts = raw.split('x');
            let w = parts.next().and_then(|s| s.parse().ok());
            let h = parts.next().and_then(|s| s.parse().ok());
            match (w, h) {
                (Some(w), Some(h)) => (w, h),
                _ => (DEFAULT_THUMBNAIL_WIDTH, DEFAULT_THUMBNAIL_HEIGHT),
            }
        }
        Err(_) => (DEFAULT_THUMBNAIL_WIDTH, DEFAULT_THUMBNAIL_HEIGHT),
    }
}
