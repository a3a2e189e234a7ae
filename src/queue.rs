//! Queue adapter (C8): the only module that talks to apalis directly.
//!
//! Two independently-backed job types give two queues without a shared
//! head-of-line: `ProcessPhotoJob` (per-photo, high volume) and
//! `ClusterIfQuietJob` (per-group, low volume, debounced). Keeping every
//! apalis call behind this module means the rest of the pipeline (worker
//! handlers, coordinator, reconciler) only depends on the two job structs
//! and the `PhotoQueue` handle below.

use apalis::prelude::*;
use apalis_sql::postgres::PostgresStorage;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Per-photo pipeline job: extract metadata, build a thumbnail, mark the
/// photo processed, then nudge the debounce coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPhotoJob {
    pub photo_id: i64,
    pub group_id: i64,
}

/// Per-group reconcile job, scheduled by the debounce coordinator after a
/// quiet window. `attempt` counts reconcile-failure retries (not
/// still-busy reschedules) so the coordinator can give up after
/// `CLUSTER_MAX_RETRIES` instead of retrying forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterIfQuietJob {
    pub group_id: i64,
    pub attempt: u32,
}

#[derive(Clone)]
pub struct PhotoQueue {
    photo_storage: PostgresStorage<ProcessPhotoJob>,
    cluster_storage: PostgresStorage<ClusterIfQuietJob>,
}

impl PhotoQueue {
    pub async fn connect(pool: PgPool) -> Result<Self, sqlx::Error> {
        PostgresStorage::setup(&pool).await?;
        Ok(PhotoQueue {
            photo_storage: PostgresStorage::new(pool.clone()),
            cluster_storage: PostgresStorage::new(pool),
        })
    }

    pub fn photo_storage(&self) -> PostgresStorage<ProcessPhotoJob> {
        self.photo_storage.clone()
    }

    pub fn cluster_storage(&self) -> PostgresStorage<ClusterIfQuietJob> {
        self.cluster_storage.clone()
    }

    /// Enqueue a photo for immediate processing, as the upload path does
    /// once the row and file are both written.
    pub async fn enqueue_photo(
        &mut self,
        photo_id: i64,
        group_id: i64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.photo_storage
            .push(ProcessPhotoJob { photo_id, group_id })
            .await?;
        Ok(())
    }

    /// Schedule a reconcile check `delay_secs` from now, as the debounce
    /// coordinator does after arming, rescheduling while busy, or
    /// retrying a failed reconcile at the given `attempt` count.
    pub async fn schedule_cluster_check(
        &mut self,
        group_id: i64,
        delay_secs: i64,
        attempt: u32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let run_at = chrono::Utc::now().timestamp() + delay_secs;
        self.cluster_storage
            .schedule(ClusterIfQuietJob { group_id, attempt }, run_at)
            .await?;
        Ok(())
    }
}
