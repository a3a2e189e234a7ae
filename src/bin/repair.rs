//! Count Repair Tool CLI (C7 / C10 operator entry point).
//!
//! `repair --dry-run` reports `photo_count` mismatches without writing.
//! `repair` applies the fixes. `repair --remove-empty` additionally deletes
//! empty auto meetings. `repair --incremental <group_id>` runs the legacy
//! per-photo attach-or-create fallback for every unattached, timestamped
//! photo in one group; it is an operator lever, never run by the worker.

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use photo_pipeline::config::Settings;
use photo_pipeline::domain::{meetings, photos};
use photo_pipeline::incremental;
use photo_pipeline::repair;

#[derive(Parser, Debug)]
#[command(about = "Recompute meeting photo counts from live photo rows")]
struct Args {
    /// Report mismatches without writing any changes.
    #[arg(long)]
    dry_run: bool,

    /// Delete auto meetings whose live photo count is zero.
    #[arg(long)]
    remove_empty: bool,

    /// Run the incremental attach-or-create fallback for every unattached,
    /// timestamped photo in the given group, one at a time. Operator-only.
    #[arg(long)]
    incremental: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    let settings = Settings::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(settings.db_pool_size)
        .connect(&settings.database_url)
        .await?;

    if let Some(group_id) = args.incremental {
        return run_incremental(&pool, group_id, &settings).await;
    }

    let report = repair::run(&pool, args.dry_run, args.remove_empty).await?;

    println!(
        "[repair] checked={} corrected={} deleted={} total_photo_count={} total_photos={} converged={}",
        report.meetings_checked,
        report.meetings_corrected,
        report.meetings_deleted,
        report.total_photo_count_after,
        report.total_photos,
        report.converged(),
    );

    if args.dry_run {
        println!("[repair] dry run: no changes written");
    }

    Ok(())
}

async fn run_incremental(
    pool: &sqlx::PgPool,
    group_id: i64,
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let Some(default_meeting) = meetings::get_default(pool, group_id).await? else {
        println!("[repair] group {} has no default meeting yet, nothing to attach", group_id);
        return Ok(());
    };

    let candidates = photos::list_for_group(pool, group_id).await?;
    let mut attached = 0;
    let mut skipped = 0;

    for photo in candidates {
        if photo.meeting_id != Some(default_meeting.id) {
            continue;
        }
        if photo.shot_at.is_none() {
            skipped += 1;
            continue;
        }

        match incremental::attach_one(pool, photo.id, settings.meeting_gap).await {
            Ok(()) => attached += 1,
            Err(e) => eprintln!("[repair] incremental attach failed for photo {}: {}", photo.id, e),
        }
    }

    println!(
        "[repair] incremental group={} attached={} skipped_undated={}",
        group_id, attached, skipped
    );

    // attach_one only moves photos; recompute counts now instead of leaving
    // them to drift until the next scheduled reconcile or repair run.
    let report = repair::run(pool, false, false).await?;
    println!(
        "[repair] post-incremental count fixup: corrected={} converged={}",
        report.meetings_corrected,
        report.converged(),
    );
    Ok(())
}
