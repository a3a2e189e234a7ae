//! Debounce coordinator (C5): collapses a burst of per-photo events into
//! at most one reconcile per group, run only after a quiet period.
//!
//! Degrades to a no-op when the KV store is unavailable — photos stay
//! attached to the group's default meeting until a later reconcile (e.g.
//! via the repair tool) catches up.

use crate::config::Settings;
use crate::kv::{CoordinationKeys, KvClient};
use crate::queue::PhotoQueue;
use crate::reconcile;
use sqlx::PgPool;

/// Minimum TTL, in whole seconds, below which `cluster_if_quiet` proceeds
/// rather than rescheduling again, to avoid livelock when the burst never
/// quite goes fully quiet.
const PROCEED_BELOW_TTL_SECS: i64 = 2;

/// Called after a per-photo job commits its extracted metadata. Arms the
/// quiet-window timer and, on the first call of a burst, schedules the
/// reconcile check.
pub async fn mark_cluster_pending(
    kv: Option<&KvClient>,
    queue: &mut PhotoQueue,
    settings: &Settings,
    group_id: i64,
) {
    let Some(kv) = kv else {
        return;
    };
    let keys = CoordinationKeys::for_group(group_id);
    let ttl_secs = settings.cluster_debounce_ttl.as_secs();

    if let Err(e) = kv.setex(&keys.pending, ttl_secs, "1").await {
        eprintln!("[coordinator] setex pending failed for group {}: {}", group_id, e);
        return;
    }
    if let Err(e) = kv.incr(&keys.count).await {
        eprintln!("[coordinator] incr count failed for group {}: {}", group_id, e);
    }

    match kv.exists(&keys.job).await {
        Ok(false) => {
            let delay = settings.cluster_retry_delay.as_secs() as i64;
            if let Err(e) = queue.schedule_cluster_check(group_id, delay, 0).await {
                eprintln!(
                    "[coordinator] failed to schedule cluster check for group {}: {}",
                    group_id, e
                );
                return;
            }
            let job_ttl = ttl_secs + delay as u64 + 30;
            if let Err(e) = kv.setex(&keys.job, job_ttl, "1").await {
                eprintln!("[coordinator] setex job failed for group {}: {}", group_id, e);
            }
        }
        Ok(true) => {}
        Err(e) => {
            eprintln!("[coordinator] exists(job) failed for group {}: {}", group_id, e);
        }
    }
}

/// Outcome of a `cluster_if_quiet` invocation, useful for tests and
/// metrics without needing a live KV connection in every caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuietOutcome {
    Rescheduled,
    Reconciled,
    ReconcileFailed,
    GaveUp,
    Skipped,
}

/// The per-group reconcile job body. Reschedules itself while the group is
/// still receiving uploads; otherwise runs the reconciler and clears the
/// coordination keys on success. `attempt` counts prior reconcile-failure
/// retries (not still-busy reschedules); once it exceeds
/// `settings.cluster_max_retries`, the coordinator gives up instead of
/// scheduling another retry, leaving the group parked on its Default
/// meeting until a later upload or the repair tool catches up.
pub async fn cluster_if_quiet(
    kv: Option<&KvClient>,
    queue: &mut PhotoQueue,
    pool: &PgPool,
    settings: &Settings,
    group_id: i64,
    attempt: u32,
) -> QuietOutcome {
    let Some(kv) = kv else {
        return QuietOutcome::Skipped;
    };
    let keys = CoordinationKeys::for_group(group_id);
    let delay = settings.cluster_retry_delay.as_secs() as i64;

    match kv.exists(&keys.pending).await {
        Ok(true) => {
            let ttl = kv.ttl(&keys.pending).await.unwrap_or(0);
            if ttl >= PROCEED_BELOW_TTL_SECS {
                if let Err(e) = queue.schedule_cluster_check(group_id, delay, attempt).await {
                    eprintln!(
                        "[coordinator] failed to reschedule cluster check for group {}: {}",
                        group_id, e
                    );
                }
                return QuietOutcome::Rescheduled;
            }
        }
        Ok(false) => {}
        Err(e) => {
            eprintln!("[coordinator] exists(pending) failed for group {}: {}", group_id, e);
        }
    }

    match reconcile::reconcile(pool, group_id, settings.meeting_gap).await {
        Ok(()) => {
            if let Err(e) = kv.delete(&keys.all()).await {
                eprintln!(
                    "[coordinator] failed to clear coordination keys for group {}: {}",
                    group_id, e
                );
            }
            QuietOutcome::Reconciled
        }
        Err(e) => {
            eprintln!("[coordinator] reconcile failed for group {}: {}", group_id, e);
            let next_attempt = attempt + 1;
            if next_attempt > settings.cluster_max_retries {
                eprintln!(
                    "[coordinator] group {} exceeded {} reconcile retries, giving up until next upload or repair",
                    group_id, settings.cluster_max_retries
                );
                let _ = kv.delete(&keys.all()).await;
                return QuietOutcome::GaveUp;
            }
            let retry_delay = (settings.cluster_retry_delay * 2).as_secs() as i64;
            if let Err(e) = queue
                .schedule_cluster_check(group_id, retry_delay, next_attempt)
                .await
            {
                eprintln!(
                    "[coordinator] failed to schedule retry for group {}, clearing keys: {}",
                    group_id, e
                );
                let _ = kv.delete(&keys.all()).await;
            }
            QuietOutcome::ReconcileFailed
        }
    }
}
