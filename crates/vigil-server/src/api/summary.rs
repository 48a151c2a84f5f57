use crate::api::{monitor_error_response, success_response, ApiError};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use utoipa_axum::{router::OpenApiRouter, routes};
use vigil_common::types::MonitoringSummary;

/// Aggregated monitoring overview: sample counts per series and alert
/// counts by status and severity.
#[utoipa::path(
    get,
    path = "/v1/summary",
    tag = "Summary",
    responses(
        (status = 200, description = "Monitoring summary", body = MonitoringSummary),
        (status = 500, description = "Storage failure", body = ApiError)
    )
)]
async fn summary(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.service.summary() {
        Ok(summary) => success_response(StatusCode::OK, &trace_id, summary),
        Err(e) => monitor_error_response(&trace_id, &e),
    }
}

pub fn summary_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(summary))
}
