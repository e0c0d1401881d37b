//! Run lifecycle bookkeeping around a pipeline invocation.
//!
//! Writes that close a run are best-effort: a failure to record the outcome
//! is logged and never replaces the error (or success) being returned.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::store::DigestStore;

const COMPLETE_ATTEMPTS: u32 = 2;

pub(crate) async fn fail_run_best_effort(store: &dyn DigestStore, run_id: Uuid, message: &str) {
    if let Err(mark_err) = store.fail_run(run_id, message).await {
        tracing::error!(
            %run_id,
            error = %mark_err,
            "failed to mark digest run as failed"
        );
    }
}

/// Returns whether the run was recorded as completed.
///
/// The email has already gone out, so the write is tried twice before the
/// run is left for the lease reaper.
pub(crate) async fn complete_run_best_effort(
    store: &dyn DigestStore,
    run_id: Uuid,
    email_sent_at: DateTime<Utc>,
) -> bool {
    for attempt in 1..=COMPLETE_ATTEMPTS {
        match store.complete_run(run_id, email_sent_at).await {
            Ok(()) => return true,
            Err(mark_err) if attempt < COMPLETE_ATTEMPTS => {
                tracing::warn!(
                    %run_id,
                    attempt,
                    error = %mark_err,
                    "could not mark digest run completed, retrying"
                );
            }
            Err(mark_err) => {
                tracing::error!(
                    %run_id,
                    error = %mark_err,
                    "digest email was sent but the run could not be marked completed"
                );
            }
        }
    }
    false
}
