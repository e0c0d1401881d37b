use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use digestd_core::RunStatus;
use digestd_pipeline::Recipient;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    map_db_error, map_pipeline_error, normalize_limit, ApiError, ApiResponse, AppState,
    ResponseMeta,
};

#[derive(Debug, Deserialize)]
pub(super) struct RunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct TriggeredRun {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub items: usize,
    pub message_id: String,
}

#[derive(Debug, Serialize)]
pub(super) struct RunItem {
    run_id: Uuid,
    status: String,
    run_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    email_sent_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

/// Runs a digest now, outside the schedule, and waits for the outcome.
pub(super) async fn trigger_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(digest_id): Path<Uuid>,
) -> Result<Json<ApiResponse<TriggeredRun>>, ApiError> {
    tracing::info!(%digest_id, request_id = %req_id.0, "manual digest run requested");

    let receipt = state
        .pipeline
        .run_digest_once(digest_id, Utc::now(), &Recipient::DigestOwner)
        .await
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    // An unrecorded completion stays processing until the lease reaper runs.
    let status = if receipt.recorded {
        RunStatus::Completed
    } else {
        RunStatus::Processing
    };

    Ok(Json(ApiResponse {
        data: TriggeredRun {
            run_id: receipt.run_id,
            status,
            items: receipt.items,
            message_id: receipt.message_id,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(digest_id): Path<Uuid>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<ApiResponse<Vec<RunItem>>>, ApiError> {
    let digest = state
        .pipeline
        .store()
        .get_digest(digest_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    if digest.is_none() {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("Digest not found: {digest_id}"),
        ));
    }

    let rows =
        digestd_db::list_runs_for_digest(&state.pool, digest_id, normalize_limit(query.limit))
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| RunItem {
            run_id: row.id,
            status: row.status,
            run_at: row.run_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            email_sent_at: row.email_sent_at,
            error_message: row.error_message,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
