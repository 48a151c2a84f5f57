use crate::api::{
    error_response, monitor_error_response, success_paginated_response, success_response, ApiError,
    Page,
};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use vigil_common::types::{Alert, MetricSample};
use vigil_storage::{MetricQuery, NewMetric};

/// Metric ingestion request
#[derive(Deserialize, ToSchema)]
struct IngestMetricRequest {
    /// Series name (e.g. `system.cpu.percent`)
    name: String,
    value: f64,
    /// Grouping dimensions (e.g. mount=/data)
    #[serde(default)]
    labels: HashMap<String, String>,
    /// Opaque caller-supplied JSON
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

/// Metric ingestion result
#[derive(Serialize, ToSchema)]
struct IngestResponse {
    metric: MetricSample,
    /// Alerts whose threshold this sample breached
    alerts_fired: Vec<Alert>,
    /// Set when the sample was stored but alert evaluation could not
    /// complete; the metric itself is durable either way
    #[serde(skip_serializing_if = "Option::is_none")]
    evaluation_error: Option<String>,
}

/// Ingest one metric sample and evaluate it against active alerts.
#[utoipa::path(
    post,
    path = "/v1/metrics",
    tag = "Metrics",
    request_body = IngestMetricRequest,
    responses(
        (status = 201, description = "Sample stored; fired alerts listed", body = IngestResponse),
        (status = 400, description = "Invalid sample", body = ApiError),
        (status = 500, description = "Storage failure", body = ApiError)
    )
)]
async fn ingest_metric(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<IngestMetricRequest>,
) -> impl IntoResponse {
    let new = NewMetric {
        name: req.name,
        value: req.value,
        labels: req.labels,
        metadata: req.metadata,
    };
    match state.service.record_metric(&new) {
        Ok(outcome) => success_response(
            StatusCode::CREATED,
            &trace_id,
            IngestResponse {
                metric: outcome.metric,
                alerts_fired: outcome.fired,
                evaluation_error: outcome.evaluation_error,
            },
        ),
        Err(e) => monitor_error_response(&trace_id, &e),
    }
}

// GET /v1/metrics
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct MetricsQueryParams {
    /// Exact series name match (optional)
    #[param(required = false)]
    #[serde(rename = "name__eq")]
    name_eq: Option<String>,
    /// Lower time bound (timestamp >=, optional)
    #[param(required = false)]
    #[serde(rename = "timestamp__gte")]
    timestamp_gte: Option<DateTime<Utc>>,
    /// Upper time bound (timestamp <=, optional)
    #[param(required = false)]
    #[serde(rename = "timestamp__lte")]
    timestamp_lte: Option<DateTime<Utc>>,
    /// Page size (default 20, capped at 1000)
    #[param(required = false)]
    limit: Option<u64>,
    /// Offset (default 0)
    #[param(required = false)]
    offset: Option<u64>,
}

/// Paginated metric samples, newest first.
#[utoipa::path(
    get,
    path = "/v1/metrics",
    tag = "Metrics",
    params(MetricsQueryParams),
    responses(
        (status = 200, description = "Paginated samples", body = Vec<MetricSample>),
        (status = 500, description = "Storage failure", body = ApiError)
    )
)]
async fn list_metrics(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<MetricsQueryParams>,
) -> impl IntoResponse {
    let page = Page::clamp(params.limit, params.offset);
    let query = MetricQuery {
        name: params.name_eq,
        from: params.timestamp_gte,
        to: params.timestamp_lte,
        limit: page.limit,
        offset: page.offset,
    };

    let total = match state.service.count_metrics(&query) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "count metrics failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Internal query error",
            );
        }
    };

    match state.service.list_metrics(&query) {
        Ok(items) => {
            success_paginated_response(StatusCode::OK, &trace_id, items, total, page.limit, page.offset)
        }
        Err(e) => {
            tracing::error!(error = %e, "query metrics failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Internal query error",
            )
        }
    }
}

pub fn metric_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(ingest_metric, list_metrics))
}
