use axum::{extract::State, Extension, Json};
use digestd_pipeline::CycleReport;

use crate::middleware::RequestId;

use super::{map_pipeline_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Runs one batch cycle synchronously and returns its report.
pub(super) async fn process_digests(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<CycleReport>>, ApiError> {
    tracing::info!(request_id = %req_id.0, "batch cycle requested over HTTP");

    let Some(outcome) = state.run_cycle_exclusive().await else {
        return Err(ApiError::new(
            req_id.0,
            "conflict",
            "a batch cycle is already running",
        ));
    };
    let report = outcome.map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}
