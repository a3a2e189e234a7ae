//! Incremental fallback (C10): the legacy per-photo attach-or-create path.
//!
//! Debounced batch reconciliation (`reconcile`) is canonical; this module
//! is retained strictly as an operator's manual lever for attaching a
//! single photo without running a full group reconcile, reachable only
//! from `repair --incremental`, never from the worker's per-photo job.

use sqlx::PgPool;
use std::time::Duration;

use crate::domain::{meetings, photos};
use crate::models::auto_title;

/// Attach a single photo to an existing nearby auto meeting, or create one,
/// using a row lock on the group's auto meetings to avoid racing a
/// concurrent incremental attach for the same group.
pub async fn attach_one(
    pool: &PgPool,
    photo_id: i64,
    gap: Duration,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let photo = photos::get(pool, photo_id)
        .await?
        .ok_or("photo not found")?;
    let Some(shot_at) = photo.shot_at else {
        return Err("photo has no timestamp; cannot attach incrementally".into());
    };

    let mut tx = pool.begin().await?;

    let candidates = meetings::list_auto_for_group(&mut *tx, photo.group_id).await?;
    let nearby = candidates.into_iter().find(|m| {
        let within_start = (shot_at - m.start_time).num_seconds().unsigned_abs()
            <= gap.as_secs();
        let within_end =
            (shot_at - m.end_time).num_seconds().unsigned_abs() <= gap.as_secs();
        within_start || within_end || (shot_at >= m.start_time && shot_at <= m.end_time)
    });

    // Only `meeting_id`/bounds are touched here; `photo_count` is left for
    // the reconciler or repair tool to recompute from live rows, matching
    // the rule that only those two call sites write that column.
    let meeting_id = match nearby {
        Some(m) => {
            let start = m.start_time.min(shot_at);
            let end = m.end_time.max(shot_at);
            meetings::expand_bounds(&mut *tx, m.id, start, end).await?;
            m.id
        }
        None => {
            let date = shot_at.date_naive();
            meetings::insert_auto(&mut *tx, photo.group_id, &auto_title(date), shot_at, shot_at, date, 0)
                .await?
        }
    };

    photos::reassign_meeting(&mut *tx, &[photo.id], meeting_id).await?;
    tx.commit().await?;
    Ok(())
}
