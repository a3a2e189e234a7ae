use google_cloud_storage::client::Storage;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use photo_pipeline::config::Settings;
use photo_pipeline::kv::KvClient;
use photo_pipeline::queue::PhotoQueue;
use photo_pipeline::worker::{self, WorkerContext};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = Arc::new(Settings::from_env());

    let pool = PgPoolOptions::new()
        .max_connections(settings.db_pool_size)
        .connect(&settings.database_url)
        .await
        .expect("Failed to connect to database");

    println!(
        "[startup] Database pool: {} max connections",
        settings.db_pool_size
    );

    // GCS client (optional - requires GOOGLE_APPLICATION_CREDENTIALS). When
    // absent, UPLOAD_DIR must be set for the local-filesystem backend.
    let gcs = match Storage::builder().build().await {
        Ok(client) => {
            println!("[startup] GCS client initialized");
            Some(client)
        }
        Err(e) => {
            println!(
                "[startup] GCS client not available: {} (local storage only)",
                e
            );
            None
        }
    };

    if gcs.is_none() && settings.upload_dir.is_none() {
        panic!("Neither GOOGLE_APPLICATION_CREDENTIALS nor UPLOAD_DIR is configured");
    }

    let kv = match &settings.redis_url {
        Some(url) => match KvClient::connect(url).await {
            Ok(client) => {
                println!("[startup] Redis KV client connected");
                Some(client)
            }
            Err(e) => {
                println!(
                    "[startup] Redis unavailable ({}): debounce coordinator degraded to no-op",
                    e
                );
                None
            }
        },
        None => {
            println!("[startup] REDIS_URL/REDIS_HOST not set: debounce coordinator degraded to no-op");
            None
        }
    };

    let queue = PhotoQueue::connect(pool.clone())
        .await
        .expect("Failed to set up apalis job storage");
    let photo_storage = queue.photo_storage();
    let cluster_storage = queue.cluster_storage();

    println!(
        "[startup] Worker starting: concurrency={} meeting_gap={}h debounce_ttl={}s",
        settings.worker_concurrency,
        settings.meeting_gap.as_secs() / 3600,
        settings.cluster_debounce_ttl.as_secs(),
    );

    let ctx = WorkerContext {
        pool,
        gcs,
        local_storage_path: settings.upload_dir.clone(),
        bucket_name: settings.gcs_bucket.clone(),
        kv,
        queue: Arc::new(tokio::sync::Mutex::new(queue)),
        settings,
    };

    worker::run(ctx, photo_storage, cluster_storage).await?;
    Ok(())
}
