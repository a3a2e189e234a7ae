//! Shared data models used across modules

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MEETING_TITLE: &str = "Default Meeting";

/// Postgres regex matching exactly the titles `auto_title` produces
/// (`Meeting YYYY-MM-DD`), so SQL-side auto-meeting filters can't also
/// catch a manual meeting a user happened to title "Meeting Notes" or
/// similar.
pub const AUTO_TITLE_SQL_PATTERN: &str = "^Meeting [0-9]{4}-[0-9]{2}-[0-9]{2}$";

/// A point on earth, stored as two floats rather than a spatial extension
/// type (see the GPS note in the design docs).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub lat: f64,
    pub lon: f64,
}

/// A photo row as read back from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Photo {
    pub id: i64,
    pub group_id: i64,
    pub uploader_id: i64,
    pub meeting_id: Option<i64>,
    pub filename_orig: String,
    pub filename_thumb: Option<String>,
    pub file_size: i64,
    pub file_hash: Option<String>,
    pub mime_type: String,
    pub shot_at: Option<DateTime<Utc>>,
    pub gps_lat: Option<f64>,
    pub gps_lon: Option<f64>,
    pub exif: Option<serde_json::Value>,
    pub is_processed: bool,
    pub processing_error: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Photo {
    pub fn gps(&self) -> Option<GpsPoint> {
        match (self.gps_lat, self.gps_lon) {
            (Some(lat), Some(lon)) => Some(GpsPoint { lat, lon }),
            _ => None,
        }
    }
}

/// How a meeting was produced; computed from `title` rather than stored,
/// so call sites never string-match directly.
#[derive(Debug, Clone, PartialEq)]
pub enum MeetingKind {
    Default,
    Auto(NaiveDate),
    Manual,
}

/// A meeting row as read back from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Meeting {
    pub id: i64,
    pub group_id: i64,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub meeting_date: Option<NaiveDate>,
    pub photo_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Meeting {
    pub fn kind(&self) -> MeetingKind {
        if self.title == DEFAULT_MEETING_TITLE {
            return MeetingKind::Default;
        }
        if let Some(date) = auto_title_date(&self.title) {
            return MeetingKind::Auto(date);
        }
        MeetingKind::Manual
    }
}

/// Build the canonical auto-meeting title for a date.
pub fn auto_title(date: NaiveDate) -> String {
    format!("Meeting {}", date.format("%Y-%m-%d"))
}

/// Parse an auto-meeting title back into its date, if it matches the
/// `Meeting <YYYY-MM-DD>` pattern produced by `auto_title`.
pub fn auto_title_date(title: &str) -> Option<NaiveDate> {
    let rest = title.strip_prefix("Meeting ")?;
    NaiveDate::parse_from_str(rest, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_title_round_trips() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let title = auto_title(date);
        assert_eq!(title, "Meeting 2025-06-10");
        assert_eq!(auto_title_date(&title), Some(date));
    }

    #[test]
    fn default_title_is_not_auto() {
        assert_eq!(auto_title_date(DEFAULT_MEETING_TITLE), None);
    }

    #[test]
    fn manual_title_is_not_auto() {
        assert_eq!(auto_title_date("Anniversary"), None);
    }
}
