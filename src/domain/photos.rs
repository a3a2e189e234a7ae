//! Photo domain - DB queries for photos.
//!
//! All functions use the generic `Executor` pattern, so they work with
//! both `&PgPool` (standalone queries) and `&mut PgConnection` (inside a
//! transaction, as the reconciler uses them).

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};

use crate::models::{Photo, AUTO_TITLE_SQL_PATTERN, DEFAULT_MEETING_TITLE};

/// Load every timestamped-or-not photo belonging to a group, ordered by id
/// for a deterministic lock-acquisition order.
pub async fn list_for_group<'e, E>(executor: E, group_id: i64) -> Result<Vec<Photo>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, group_id, uploader_id, meeting_id, filename_orig, filename_thumb,
               file_size, file_hash, mime_type, shot_at, gps_lat, gps_lon, exif,
               is_processed, processing_error, uploaded_at, updated_at
        FROM photos
        WHERE group_id = $1
        ORDER BY id ASC
        "#,
    )
    .bind(group_id)
    .fetch_all(executor)
    .await
}

/// Load the photos the reconciler is allowed to re-cluster: unattached, on
/// the default meeting, or on an existing auto `Meeting <date>` bucket.
/// Photos sitting on a manual meeting are excluded, so reconcile's
/// clustering pass can never move them out of it.
pub async fn list_reconcilable_for_group<'e, E>(
    executor: E,
    group_id: i64,
) -> Result<Vec<Photo>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, group_id, uploader_id, meeting_id, filename_orig, filename_thumb,
               file_size, file_hash, mime_type, shot_at, gps_lat, gps_lon, exif,
               is_processed, processing_error, uploaded_at, updated_at
        FROM photos
        WHERE group_id = $1
          AND (
              meeting_id IS NULL
              OR meeting_id IN (
                  SELECT id FROM meetings
                  WHERE group_id = $1 AND (title = $2 OR title ~ $3)
              )
          )
        ORDER BY id ASC
        "#,
    )
    .bind(group_id)
    .bind(DEFAULT_MEETING_TITLE)
    .bind(AUTO_TITLE_SQL_PATTERN)
    .fetch_all(executor)
    .await
}

pub async fn get<'e, E>(executor: E, photo_id: i64) -> Result<Option<Photo>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, group_id, uploader_id, meeting_id, filename_orig, filename_thumb,
               file_size, file_hash, mime_type, shot_at, gps_lat, gps_lon, exif,
               is_processed, processing_error, uploaded_at, updated_at
        FROM photos
        WHERE id = $1
        "#,
    )
    .bind(photo_id)
    .fetch_optional(executor)
    .await
}

/// Reassign every photo in `photo_ids` to `meeting_id`. Used by the
/// reconciler's park and assign phases.
pub async fn reassign_meeting<'e, E>(
    executor: E,
    photo_ids: &[i64],
    meeting_id: i64,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("UPDATE photos SET meeting_id = $1, updated_at = NOW() WHERE id = ANY($2)")
        .bind(meeting_id)
        .bind(photo_ids)
        .execute(executor)
        .await?;
    Ok(())
}

/// Park every photo currently on the group's default or an auto meeting
/// onto the default meeting, ahead of pruning stale auto meetings. Photos
/// sitting on a manual meeting are never touched: manual meetings must
/// survive any number of reconciles unchanged.
pub async fn park_group_on_default<'e, E>(
    executor: E,
    group_id: i64,
    default_meeting_id: i64,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        UPDATE photos
        SET meeting_id = $1, updated_at = NOW()
        WHERE group_id = $2
          AND meeting_id IN (
              SELECT id FROM meetings
              WHERE group_id = $2 AND (title = $3 OR title ~ $4)
          )
        "#,
    )
    .bind(default_meeting_id)
    .bind(group_id)
    .bind(DEFAULT_MEETING_TITLE)
    .bind(AUTO_TITLE_SQL_PATTERN)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn count_for_meeting<'e, E>(executor: E, meeting_id: i64) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM photos WHERE meeting_id = $1")
        .bind(meeting_id)
        .fetch_one(executor)
        .await?;
    Ok(row.0)
}

pub async fn count_for_group<'e, E>(executor: E, group_id: i64) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM photos WHERE group_id = $1")
        .bind(group_id)
        .fetch_one(executor)
        .await?;
    Ok(row.0)
}

/// Persist extracted metadata for a photo (C1's write-back).
pub async fn set_metadata<'e, E>(
    executor: E,
    photo_id: i64,
    shot_at: Option<DateTime<Utc>>,
    gps_lat: Option<f64>,
    gps_lon: Option<f64>,
    exif: &serde_json::Value,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        UPDATE photos
        SET shot_at = $1, gps_lat = $2, gps_lon = $3, exif = $4, updated_at = NOW()
        WHERE id = $5
        "#,
    )
    .bind(shot_at)
    .bind(gps_lat)
    .bind(gps_lon)
    .bind(exif)
    .bind(photo_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Persist the generated thumbnail filename (C2's write-back).
pub async fn set_thumbnail<'e, E>(
    executor: E,
    photo_id: i64,
    filename_thumb: &str,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("UPDATE photos SET filename_thumb = $1, updated_at = NOW() WHERE id = $2")
        .bind(filename_thumb)
        .bind(photo_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn mark_processed<'e, E>(
    executor: E,
    photo_id: i64,
    processing_error: Option<&str>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        "UPDATE photos SET is_processed = TRUE, processing_error = $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(processing_error)
    .bind(photo_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Insert a new photo row attached to the group's default meeting. Used by
/// the (out-of-scope) upload path; kept here so its contract is testable
/// alongside the rest of the domain layer.
#[allow(clippy::too_many_arguments)]
pub async fn insert<'e, E>(
    executor: E,
    group_id: i64,
    uploader_id: i64,
    meeting_id: i64,
    filename_orig: &str,
    file_size: i64,
    file_hash: Option<&str>,
    mime_type: &str,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO photos (group_id, uploader_id, meeting_id, filename_orig, file_size,
                             file_hash, mime_type, is_processed, uploaded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, NOW())
        RETURNING id
        "#,
    )
    .bind(group_id)
    .bind(uploader_id)
    .bind(meeting_id)
    .bind(filename_orig)
    .bind(file_size)
    .bind(file_hash)
    .bind(mime_type)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

/// Delete a photo row. Paired with a blob-store delete by the caller when
/// cleaning up a failed upload, mirroring the no-orphan guarantee.
pub async fn delete<'e, E>(executor: E, photo_id: i64) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("DELETE FROM photos WHERE id = $1")
        .bind(photo_id)
        .execute(executor)
        .await?;
    Ok(())
}
