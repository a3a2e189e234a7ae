//! The reconciler (C4): rebuilds a group's meeting set to match the
//! clustering of its current photos, idempotently.
//!
//! Runs as a single transaction: park -> prune -> cluster -> assign ->
//! recompute default count -> commit. Manual meetings (anything that is
//! neither the default sentinel nor an auto `Meeting <date>` bucket) are
//! never touched.

use sqlx::PgPool;
use std::time::Duration;

use crate::cluster::{self, Dated};
use crate::domain::{meetings, photos};
use crate::models::auto_title;

/// Rebuild `group_id`'s meeting set. Safe to call repeatedly; a call on an
/// unchanged group leaves the database unchanged.
pub async fn reconcile(
    pool: &PgPool,
    group_id: i64,
    gap: Duration,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let group_photos = photos::list_reconcilable_for_group(pool, group_id).await?;
    if group_photos.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    let default_id = match meetings::get_default(&mut *tx, group_id).await? {
        Some(m) => m.id,
        None => match meetings::insert_default(&mut *tx, group_id).await {
            Ok(id) => id,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                meetings::get_default(&mut *tx, group_id)
                    .await?
                    .ok_or("default meeting vanished after unique violation")?
                    .id
            }
            Err(e) => return Err(e.into()),
        },
    };

    photos::park_group_on_default(&mut *tx, group_id, default_id).await?;

    for auto in meetings::list_auto_for_group(&mut *tx, group_id).await? {
        let actual = photos::count_for_meeting(&mut *tx, auto.id).await?;
        if actual == 0 {
            meetings::delete(&mut *tx, auto.id).await?;
        }
    }

    let dated: Vec<Dated<i64>> = group_photos
        .iter()
        .map(|p| Dated {
            id: p.id,
            shot_at: p.shot_at,
        })
        .collect();
    let clusters = cluster::cluster(&dated, gap);

    for bucket in clusters {
        let Some(date) = bucket.meeting_date else {
            // Undated bucket: photos stay parked on the default meeting.
            continue;
        };
        let title = auto_title(date);
        let start = bucket.start_time.expect("dated bucket has a start time");
        let end = bucket.end_time.expect("dated bucket has an end time");

        match meetings::get_auto_by_date(&mut *tx, group_id, &title).await? {
            Some(existing) => {
                meetings::expand_auto(&mut *tx, existing.id, start, end, bucket.ids.len() as i64)
                    .await?;
                photos::reassign_meeting(&mut *tx, &bucket.ids, existing.id).await?;
            }
            None => {
                let meeting_id = meetings::insert_auto(
                    &mut *tx,
                    group_id,
                    &title,
                    start,
                    end,
                    date,
                    bucket.ids.len() as i64,
                )
                .await?;
                photos::reassign_meeting(&mut *tx, &bucket.ids, meeting_id).await?;
            }
        }
    }

    let default_count = photos::count_for_meeting(&mut *tx, default_id).await?;
    meetings::set_photo_count(&mut *tx, default_id, default_count).await?;

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    // The reconciler's behaviour is exercised indirectly through
    // `cluster::tests` (the pure partitioning it drives) and through the
    // repair tool's convergence tests, since this module requires a live
    // Postgres connection that isn't available in this test environment.
}
