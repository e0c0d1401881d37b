//! The batch driver: one scheduling cycle over every due digest.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use digestd_core::{group_due, BatchConfig, Digest};
use futures::future::join_all;
use serde::Serialize;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::retry::retry_with_backoff;
use crate::store::DigestStore;

/// Runs the pipeline for one digest. Each call is one attempt and opens its
/// own run.
#[async_trait]
pub trait DigestExecutor: Send + Sync {
    async fn execute(&self, digest: &Digest, run_at: DateTime<Utc>) -> Result<(), PipelineError>;
}

/// Outcome of one cycle. `total_digests` counts every active digest
/// considered, due or not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub processed_digests: Vec<Uuid>,
    pub failed_digests: Vec<Uuid>,
    pub total_digests: usize,
}

/// Select due digests and run them.
///
/// Stale `processing` runs are reaped first so a crashed worker cannot hold a
/// digest's lease forever. Due digests are grouped by frequency; each group
/// runs in batches of `config.batch_size` concurrent digests with
/// `config.batch_delay` between batches. Each digest gets up to
/// `config.max_attempts` attempts with exponential back-off. A digest that
/// exhausts its attempts is reported failed and the cycle moves on.
///
/// # Errors
///
/// Returns [`PipelineError::Store`] only if the active digests cannot be
/// listed. Per-digest failures are reported, not returned.
pub async fn run_cycle(
    store: &dyn DigestStore,
    executor: &dyn DigestExecutor,
    config: &BatchConfig,
    now: DateTime<Utc>,
) -> Result<CycleReport, PipelineError> {
    match store.reap_stale_runs(config.run_lease).await {
        Ok(0) => {}
        Ok(reaped) => tracing::warn!(reaped, "failed runs that outlived their lease"),
        Err(e) => tracing::error!(error = %e, "could not reap stale runs"),
    }

    let active = store.list_active_digests().await?;
    let mut report = CycleReport {
        total_digests: active.len(),
        ..CycleReport::default()
    };
    let groups = group_due(active, now);
    let due: usize = groups.values().map(Vec::len).sum();
    tracing::info!(total = report.total_digests, due, "batch cycle started");

    let batch_size = config.batch_size.max(1);
    for (frequency, digests) in &groups {
        let batches: Vec<&[Digest]> = digests.chunks(batch_size).collect();
        tracing::debug!(
            frequency = frequency.as_str(),
            digests = digests.len(),
            batches = batches.len(),
            "processing frequency group"
        );

        for (index, batch) in batches.iter().enumerate() {
            let outcomes = join_all(
                batch
                    .iter()
                    .map(|digest| run_with_retry(executor, digest, config, now)),
            )
            .await;

            for (digest, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    Ok(()) => report.processed_digests.push(digest.id),
                    Err(e) => {
                        tracing::error!(
                            digest_id = %digest.id,
                            error = %e,
                            "digest failed for this cycle"
                        );
                        report.failed_digests.push(digest.id);
                    }
                }
            }

            if index + 1 < batches.len() {
                tokio::time::sleep(config.batch_delay).await;
            }
        }
    }

    tracing::info!(
        processed = report.processed_digests.len(),
        failed = report.failed_digests.len(),
        total = report.total_digests,
        "batch cycle finished"
    );
    Ok(report)
}

async fn run_with_retry(
    executor: &dyn DigestExecutor,
    digest: &Digest,
    config: &BatchConfig,
    run_at: DateTime<Utc>,
) -> Result<(), PipelineError> {
    retry_with_backoff(
        config.max_attempts,
        PipelineError::is_retriable,
        |attempt| config.backoff_for(attempt),
        |attempt| {
            tracing::debug!(digest_id = %digest.id, attempt, "running digest");
            executor.execute(digest, run_at)
        },
    )
    .await
}
