//! Worker (C6): durable job consumers for the two named queues.
//!
//! `process_photo` runs the per-photo pipeline (extract -> mark-pending ->
//! thumbnail -> commit). `cluster_if_quiet` runs the debounce coordinator's
//! per-group reconcile check. Kept on separate apalis-backed queues so a
//! slow reconcile can't delay thumbnail/EXIF jobs.

use apalis::prelude::*;
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::domain::photos;
use crate::kv::KvClient;
use crate::queue::{ClusterIfQuietJob, PhotoQueue, ProcessPhotoJob};
use crate::{coordinator, metadata, storage, thumbnails};

#[derive(Clone)]
pub struct WorkerContext {
    pub pool: PgPool,
    pub gcs: Option<google_cloud_storage::client::Storage>,
    pub local_storage_path: Option<PathBuf>,
    pub bucket_name: String,
    pub kv: Option<KvClient>,
    pub queue: Arc<tokio::sync::Mutex<PhotoQueue>>,
    pub settings: Arc<Settings>,
}

/// A per-photo job failure is either terminal (the job can never succeed,
/// e.g. the row or file is gone) or retryable (a transient storage/DB
/// problem that apalis's retry policy should handle).
enum ProcessPhotoError {
    Terminal(String),
    Retryable(Box<dyn std::error::Error + Send + Sync>),
}

/// `google-cloud-storage` doesn't expose a downcastable not-found variant,
/// so a missing GCS object is recognized by matching its message. Best
/// effort: if the crate ever changes its wording this falls back to
/// Retryable, same as before this check existed.
fn is_not_found(e: &(dyn std::error::Error + 'static)) -> bool {
    if let Some(io_err) = e.downcast_ref::<std::io::Error>() {
        return io_err.kind() == std::io::ErrorKind::NotFound;
    }
    let msg = e.to_string().to_lowercase();
    msg.contains("404") || msg.contains("not found") || msg.contains("no such object")
}

async fn process_photo_job(job: ProcessPhotoJob, ctx: Data<WorkerContext>) -> Result<(), Error> {
    match process_photo(&ctx, job.photo_id, job.group_id).await {
        Ok(()) => Ok(()),
        Err(ProcessPhotoError::Terminal(msg)) => {
            eprintln!(
                "[worker] process_photo terminal failure for photo {} (no retry): {}",
                job.photo_id, msg
            );
            Ok(())
        }
        Err(ProcessPhotoError::Retryable(e)) => {
            eprintln!(
                "[worker] process_photo failed for photo {} (will retry): {}",
                job.photo_id, e
            );
            Err(Error::Failed(Arc::new(e)))
        }
    }
}

async fn process_photo(
    ctx: &WorkerContext,
    photo_id: i64,
    group_id: i64,
) -> Result<(), ProcessPhotoError> {
    let photo = photos::get(&ctx.pool, photo_id)
        .await
        .map_err(|e| ProcessPhotoError::Retryable(e.into()))?;
    let photo = match photo {
        Some(p) => p,
        None => {
            return Err(ProcessPhotoError::Terminal(format!(
                "photo {} row missing at job start",
                photo_id
            )));
        }
    };

    let blob_path = thumbnails::thumbnail_path_for(group_id, &photo.filename_orig);
    let data = match storage::download_capture(
        ctx.gcs.as_ref(),
        ctx.local_storage_path.as_ref(),
        &ctx.bucket_name,
        &blob_path,
    )
    .await
    {
        Ok(d) => d,
        Err(e) if is_not_found(e.as_ref()) => {
            return Err(ProcessPhotoError::Terminal(format!(
                "photo {} file missing at {}: {}",
                photo_id, blob_path, e
            )));
        }
        Err(e) => return Err(ProcessPhotoError::Retryable(e)),
    };

    let extracted = metadata::extract(&data, &photo.mime_type, ctx.settings.metadata_timeout).await;
    photos::set_metadata(
        &ctx.pool,
        photo_id,
        extracted.shot_at,
        extracted.gps.map(|(lat, _)| lat),
        extracted.gps.map(|(_, lon)| lon),
        &extracted.raw,
    )
    .await
    .map_err(|e| ProcessPhotoError::Retryable(e.into()))?;

    {
        let mut queue = ctx.queue.lock().await;
        coordinator::mark_cluster_pending(ctx.kv.as_ref(), &mut queue, &ctx.settings, group_id)
            .await;
    }

    let mut processing_error: Option<String> = None;

    match thumbnails::build_thumbnail(
        &data,
        &photo.mime_type,
        ctx.settings.thumbnail_width,
        ctx.settings.thumbnail_height,
        ctx.settings.thumbnail_quality,
        ctx.settings.thumbnail_timeout,
        ctx.settings.ffmpeg_threads,
    )
    .await
    {
        Ok(thumb_bytes) => {
            let thumb_filename = thumbnails::thumbnail_filename();
            let thumb_path = thumbnails::thumbnail_path_for(group_id, &thumb_filename);
            match storage::upload_data(
                ctx.gcs.as_ref(),
                ctx.local_storage_path.as_ref(),
                &ctx.bucket_name,
                &thumb_path,
                &thumb_bytes,
            )
            .await
            {
                Ok(()) => {
                    if let Err(e) = photos::set_thumbnail(&ctx.pool, photo_id, &thumb_filename).await
                    {
                        eprintln!(
                            "[worker] failed to persist thumbnail filename for photo {}: {}",
                            photo_id, e
                        );
                        processing_error = Some(format!("thumbnail filename persist failed: {}", e));
                        if let Err(cleanup_err) = storage::delete_data(
                            ctx.gcs.as_ref(),
                            ctx.local_storage_path.as_ref(),
                            &ctx.bucket_name,
                            &thumb_path,
                        )
                        .await
                        {
                            eprintln!(
                                "[worker] failed to clean up orphaned thumbnail {}: {}",
                                thumb_path, cleanup_err
                            );
                        }
                    }
                }
                Err(e) => {
                    eprintln!("[worker] failed to upload thumbnail for photo {}: {}", photo_id, e);
                    processing_error = Some(format!("thumbnail upload failed: {}", e));
                }
            }
        }
        Err(e) => {
            eprintln!("[worker] thumbnail generation failed for photo {}: {}", photo_id, e);
            processing_error = Some(format!("thumbnail generation failed: {}", e));
        }
    }

    photos::mark_processed(&ctx.pool, photo_id, processing_error.as_deref())
        .await
        .map_err(|e| ProcessPhotoError::Retryable(e.into()))?;
    Ok(())
}

async fn cluster_if_quiet_job(job: ClusterIfQuietJob, ctx: Data<WorkerContext>) -> Result<(), Error> {
    let mut queue = ctx.queue.lock().await;
    coordinator::cluster_if_quiet(
        ctx.kv.as_ref(),
        &mut queue,
        &ctx.pool,
        &ctx.settings,
        job.group_id,
        job.attempt,
    )
    .await;
    Ok(())
}

/// Start both the per-photo and per-group apalis workers under a shared
/// monitor. Returns once the monitor exits (normally only on shutdown or
/// an unrecoverable backend error).
pub async fn run(
    ctx: WorkerContext,
    photo_storage: apalis_sql::postgres::PostgresStorage<ProcessPhotoJob>,
    cluster_storage: apalis_sql::postgres::PostgresStorage<ClusterIfQuietJob>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let concurrency = ctx.settings.worker_concurrency;

    let photo_worker = WorkerBuilder::new("process-photo-worker")
        .data(ctx.clone())
        .concurrency(concurrency)
        .backend(photo_storage)
        .build_fn(process_photo_job);

    let cluster_worker = WorkerBuilder::new("cluster-if-quiet-worker")
        .data(ctx)
        .concurrency(1)
        .backend(cluster_storage)
        .build_fn(cluster_if_quiet_job);

    Monitor::new()
        .register(photo_worker)
        .register(cluster_worker)
        .run()
        .await?;
    Ok(())
}
