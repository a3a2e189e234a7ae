//! Meeting domain - DB queries for meetings.
//!
//! `photo_count` is written only from here, and only by the two call sites
//! that are allowed to: the reconciler and the repair tool. No other module
//! should update this column.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Postgres};

use crate::models::{Meeting, AUTO_TITLE_SQL_PATTERN, DEFAULT_MEETING_TITLE};

pub async fn get_default<'e, E>(
    executor: E,
    group_id: i64,
) -> Result<Option<Meeting>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, group_id, title, start_time, end_time, meeting_date, photo_count,
               created_at, updated_at
        FROM meetings
        WHERE group_id = $1 AND title = $2
        "#,
    )
    .bind(group_id)
    .bind(DEFAULT_MEETING_TITLE)
    .fetch_optional(executor)
    .await
}

/// Insert the group's default meeting. Callers must handle a unique
/// violation on `(group_id, title)` by re-reading: under concurrent
/// reconciles, two workers may race to create it.
pub async fn insert_default<'e, E>(executor: E, group_id: i64) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let epoch = DateTime::<Utc>::UNIX_EPOCH;
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO meetings (group_id, title, start_time, end_time, meeting_date, photo_count, created_at)
        VALUES ($1, $2, $3, $3, NULL, 0, NOW())
        RETURNING id
        "#,
    )
    .bind(group_id)
    .bind(DEFAULT_MEETING_TITLE)
    .bind(epoch)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

pub async fn get_auto_by_date<'e, E>(
    executor: E,
    group_id: i64,
    title: &str,
) -> Result<Option<Meeting>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, group_id, title, start_time, end_time, meeting_date, photo_count,
               created_at, updated_at
        FROM meetings
        WHERE group_id = $1 AND title = $2
        "#,
    )
    .bind(group_id)
    .bind(title)
    .fetch_optional(executor)
    .await
}

pub async fn list_auto_for_group<'e, E>(
    executor: E,
    group_id: i64,
) -> Result<Vec<Meeting>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, group_id, title, start_time, end_time, meeting_date, photo_count,
               created_at, updated_at
        FROM meetings
        WHERE group_id = $1 AND title ~ $2
        "#,
    )
    .bind(group_id)
    .bind(AUTO_TITLE_SQL_PATTERN)
    .fetch_all(executor)
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_auto<'e, E>(
    executor: E,
    group_id: i64,
    title: &str,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    meeting_date: NaiveDate,
    photo_count: i64,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO meetings (group_id, title, start_time, end_time, meeting_date, photo_count, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW())
        RETURNING id
        "#,
    )
    .bind(group_id)
    .bind(title)
    .bind(start_time)
    .bind(end_time)
    .bind(meeting_date)
    .bind(photo_count)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

/// Expand an existing auto meeting's time bounds and bump its count. Used
/// when a reconcile bucket merges into a meeting created by a prior
/// reconcile of the same date.
pub async fn expand_auto<'e, E>(
    executor: E,
    meeting_id: i64,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    additional_photos: i64,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        UPDATE meetings
        SET start_time = LEAST(start_time, $1),
            end_time = GREATEST(end_time, $2),
            photo_count = photo_count + $3,
            updated_at = NOW()
        WHERE id = $4
        "#,
    )
    .bind(start_time)
    .bind(end_time)
    .bind(additional_photos)
    .bind(meeting_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Expand an existing auto meeting's time bounds without touching
/// `photo_count`. Used by the incremental fallback, which attaches photos
/// one at a time and leaves count reconciliation to the reconciler or
/// repair tool.
pub async fn expand_bounds<'e, E>(
    executor: E,
    meeting_id: i64,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        UPDATE meetings
        SET start_time = LEAST(start_time, $1),
            end_time = GREATEST(end_time, $2),
            updated_at = NOW()
        WHERE id = $3
        "#,
    )
    .bind(start_time)
    .bind(end_time)
    .bind(meeting_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn set_photo_count<'e, E>(
    executor: E,
    meeting_id: i64,
    photo_count: i64,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("UPDATE meetings SET photo_count = $1, updated_at = NOW() WHERE id = $2")
        .bind(photo_count)
        .bind(meeting_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn delete<'e, E>(executor: E, meeting_id: i64) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("DELETE FROM meetings WHERE id = $1")
        .bind(meeting_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn list_for_group<'e, E>(executor: E, group_id: i64) -> Result<Vec<Meeting>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, group_id, title, start_time, end_time, meeting_date, photo_count,
               created_at, updated_at
        FROM meetings
        WHERE group_id = $1
        "#,
    )
    .bind(group_id)
    .fetch_all(executor)
    .await
}

pub async fn list_all<'e, E>(executor: E) -> Result<Vec<Meeting>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, group_id, title, start_time, end_time, meeting_date, photo_count,
               created_at, updated_at
        FROM meetings
        "#,
    )
    .fetch_all(executor)
    .await
}
