//! Background job scheduler.
//!
//! Registers the recurring sync pass unless `FLORADESK_SYNC_CRON` is empty.

use std::sync::Arc;

use floradesk_core::AppConfig;
use floradesk_sync::{run_recorded_sync, SyncGuard, TriggerSource};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is rejected, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<AppConfig>,
    guard: SyncGuard,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    match config.sync_cron.clone() {
        Some(schedule) => {
            register_sync_job(&scheduler, &schedule, pool, config, guard).await?;
            tracing::info!(schedule = %schedule, "scheduler: sync job registered");
        }
        None => tracing::info!("scheduler: FLORADESK_SYNC_CRON is empty; no sync job"),
    }

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the recurring sync pass. A tick that finds a pass already running
/// is skipped.
async fn register_sync_job(
    scheduler: &JobScheduler,
    schedule: &str,
    pool: PgPool,
    config: Arc<AppConfig>,
    guard: SyncGuard,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);
        let guard = guard.clone();

        Box::pin(async move {
            run_scheduled_sync(&pool, &config, &guard).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn run_scheduled_sync(pool: &PgPool, config: &AppConfig, guard: &SyncGuard) {
    let Some(_permit) = guard.try_acquire() else {
        tracing::info!("scheduler: sync already running; skipping tick");
        return;
    };

    tracing::info!("scheduler: starting sync");
    match run_recorded_sync(pool, config, TriggerSource::Scheduler).await {
        Ok(summary) => tracing::info!(
            varieties = summary.varieties_derived,
            orders = summary.orders_synced,
            items = summary.items_inserted,
            degraded = summary.is_degraded(),
            "scheduler: sync complete"
        ),
        Err(e) => tracing::error!(error = %e, "scheduler: sync failed"),
    }
}
