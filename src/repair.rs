//! Count repair tool (C7): offline sweep that recomputes `photo_count` from
//! live photo rows. Safe to run against a live database — it only ever
//! touches one meeting at a time, point reads and point writes, no
//! wholesale locks.

use sqlx::PgPool;

use crate::domain::{meetings, photos};
use crate::models::MeetingKind;

#[derive(Debug, Clone, Copy, Default)]
pub struct RepairReport {
    pub meetings_checked: usize,
    pub meetings_corrected: usize,
    pub meetings_deleted: usize,
    pub total_photo_count_after: i64,
    pub total_photos: i64,
}

impl RepairReport {
    /// The invariant the whole tool exists to restore: the sum of every
    /// meeting's `photo_count` equals the number of photos that exist.
    pub fn converged(&self) -> bool {
        self.total_photo_count_after == self.total_photos
    }
}

/// Run the repair sweep. `dry_run` reports mismatches without writing;
/// `remove_empty` additionally deletes auto meetings with zero live
/// photos once their count would otherwise be corrected to zero.
pub async fn run(
    pool: &PgPool,
    dry_run: bool,
    remove_empty: bool,
) -> Result<RepairReport, Box<dyn std::error::Error + Send + Sync>> {
    let mut report = RepairReport::default();
    let all_meetings = meetings::list_all(pool).await?;

    for meeting in all_meetings {
        report.meetings_checked += 1;
        let actual = photos::count_for_meeting(pool, meeting.id).await?;

        if actual == 0 && remove_empty && matches!(meeting.kind(), MeetingKind::Auto(_)) {
            if !dry_run {
                meetings::delete(pool, meeting.id).await?;
            }
            report.meetings_deleted += 1;
            continue;
        }

        if actual != meeting.photo_count {
            if !dry_run {
                meetings::set_photo_count(pool, meeting.id, actual).await?;
            }
            report.meetings_corrected += 1;
        }

        report.total_photo_count_after += actual;
    }

    report.total_photos = total_photo_count(pool).await?;
    Ok(report)
}

async fn total_photo_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM photos")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converged_report_matches_totals() {
        let report = RepairReport {
            meetings_checked: 3,
            meetings_corrected: 1,
            meetings_deleted: 0,
            total_photo_count_after: 10,
            total_photos: 10,
        };
        assert!(report.converged());
    }

    #[test]
    fn diverged_report_does_not_match() {
        let report = RepairReport {
            total_photo_count_after: 9,
            total_photos: 10,
            ..Default::default()
        };
        assert!(!report.converged());
    }
}
