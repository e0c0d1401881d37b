//! Background job scheduler.
//!
//! Registers the recurring batch cycle on `DIGESTD_CRON` at server startup.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::AppState;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down the job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the cron expression is invalid or the
/// scheduler cannot be initialised or started.
pub async fn build_scheduler(state: AppState, cron: &str) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let state = state.clone();

        Box::pin(async move {
            tracing::info!("scheduler: starting digest batch cycle");
            run_scheduled_cycle(&state).await;
        })
    })?;
    scheduler.add(job).await?;

    scheduler.start().await?;
    tracing::info!(cron, "scheduler: digest batch cycle registered");
    Ok(scheduler)
}

async fn run_scheduled_cycle(state: &AppState) {
    match state.run_cycle_exclusive().await {
        None => tracing::warn!("scheduler: previous cycle still running; skipping this tick"),
        Some(Ok(report)) => tracing::info!(
            processed = report.processed_digests.len(),
            failed = report.failed_digests.len(),
            total = report.total_digests,
            "scheduler: digest batch cycle complete"
        ),
        Some(Err(e)) => tracing::error!(error = %e, "scheduler: digest batch cycle failed"),
    }
}
