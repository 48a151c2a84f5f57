use crate::api::{error_response, monitor_error_response, success_response, ApiError};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use vigil_common::types::{Alert, AlertStatus, Condition, HistoryEntry, Severity};
use vigil_storage::NewAlert;

/// Alert creation request
#[derive(Deserialize, ToSchema)]
struct CreateAlertRequest {
    /// Exact metric name the alert watches
    metric_name: String,
    /// One of gt / lt / eq / neq
    condition: String,
    threshold: f64,
    /// One of info / warning / critical
    severity: String,
    /// Opaque caller-supplied JSON
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

/// Create a threshold alert in `active` state.
#[utoipa::path(
    post,
    path = "/v1/alerts",
    tag = "Alerts",
    request_body = CreateAlertRequest,
    responses(
        (status = 201, description = "Alert created", body = Alert),
        (status = 400, description = "Invalid condition/severity or empty metric name", body = ApiError),
        (status = 500, description = "Storage failure", body = ApiError)
    )
)]
async fn create_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateAlertRequest>,
) -> impl IntoResponse {
    let condition: Condition = match req.condition.parse() {
        Ok(c) => c,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &e),
    };
    let severity: Severity = match req.severity.parse() {
        Ok(s) => s,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &e),
    };

    let new = NewAlert {
        metric_name: req.metric_name,
        condition,
        threshold: req.threshold,
        severity,
        metadata: req.metadata,
    };
    match state.service.create_alert(&new) {
        Ok(alert) => success_response(StatusCode::CREATED, &trace_id, alert),
        Err(e) => monitor_error_response(&trace_id, &e),
    }
}

// GET /v1/alerts
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct AlertListParams {
    /// Status filter: active / resolved (optional)
    #[param(required = false)]
    #[serde(rename = "status__eq")]
    status_eq: Option<String>,
    /// Severity filter: info / warning / critical (optional)
    #[param(required = false)]
    #[serde(rename = "severity__eq")]
    severity_eq: Option<String>,
}

/// List alerts, newest first.
#[utoipa::path(
    get,
    path = "/v1/alerts",
    tag = "Alerts",
    params(AlertListParams),
    responses(
        (status = 200, description = "Alert list", body = Vec<Alert>),
        (status = 400, description = "Invalid filter value", body = ApiError),
        (status = 500, description = "Storage failure", body = ApiError)
    )
)]
async fn list_alerts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<AlertListParams>,
) -> impl IntoResponse {
    let status = match params.status_eq.as_deref().map(str::parse::<AlertStatus>) {
        None => None,
        Some(Ok(s)) => Some(s),
        Some(Err(e)) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &e)
        }
    };
    let severity = match params.severity_eq.as_deref().map(str::parse::<Severity>) {
        None => None,
        Some(Ok(s)) => Some(s),
        Some(Err(e)) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &e)
        }
    };

    match state.service.list_alerts(status, severity) {
        Ok(items) => success_response(StatusCode::OK, &trace_id, items),
        Err(e) => monitor_error_response(&trace_id, &e),
    }
}

/// Fetch one alert.
#[utoipa::path(
    get,
    path = "/v1/alerts/{id}",
    tag = "Alerts",
    params(
        ("id" = String, Path, description = "Alert ID")
    ),
    responses(
        (status = 200, description = "Alert", body = Alert),
        (status = 404, description = "Unknown alert", body = ApiError)
    )
)]
async fn get_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.service.get_alert(&id) {
        Ok(alert) => success_response(StatusCode::OK, &trace_id, alert),
        Err(e) => monitor_error_response(&trace_id, &e),
    }
}

/// Alert update request
#[derive(Deserialize, ToSchema)]
struct UpdateAlertRequest {
    /// Only `resolved` is accepted; anything else is a conflict or a
    /// validation error
    #[serde(default)]
    status: Option<String>,
    /// Replaces the whole metadata document
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

/// Partially update an alert (status and/or metadata).
#[utoipa::path(
    patch,
    path = "/v1/alerts/{id}",
    tag = "Alerts",
    params(
        ("id" = String, Path, description = "Alert ID")
    ),
    request_body = UpdateAlertRequest,
    responses(
        (status = 200, description = "Updated alert", body = Alert),
        (status = 400, description = "Unknown status value", body = ApiError),
        (status = 404, description = "Unknown alert", body = ApiError),
        (status = 409, description = "Illegal status transition", body = ApiError)
    )
)]
async fn update_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAlertRequest>,
) -> impl IntoResponse {
    let status = match req.status.as_deref().map(str::parse::<AlertStatus>) {
        None => None,
        Some(Ok(s)) => Some(s),
        Some(Err(e)) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &e)
        }
    };

    match state.service.update_alert(&id, status, req.metadata.as_ref()) {
        Ok(alert) => success_response(StatusCode::OK, &trace_id, alert),
        Err(e) => monitor_error_response(&trace_id, &e),
    }
}

/// Resolve an alert. Idempotent; the first call stamps `resolved_at`.
#[utoipa::path(
    post,
    path = "/v1/alerts/{id}/resolve",
    tag = "Alerts",
    params(
        ("id" = String, Path, description = "Alert ID")
    ),
    responses(
        (status = 200, description = "Resolved alert", body = Alert),
        (status = 404, description = "Unknown alert", body = ApiError)
    )
)]
async fn resolve_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.service.resolve_alert(&id) {
        Ok(alert) => success_response(StatusCode::OK, &trace_id, alert),
        Err(e) => monitor_error_response(&trace_id, &e),
    }
}

// GET /v1/alerts/{id}/history
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct HistoryParams {
    /// Lower time bound (optional)
    #[param(required = false)]
    #[serde(rename = "timestamp__gte")]
    timestamp_gte: Option<DateTime<Utc>>,
    /// Upper time bound (optional)
    #[param(required = false)]
    #[serde(rename = "timestamp__lte")]
    timestamp_lte: Option<DateTime<Utc>>,
}

/// Fire events for one alert, newest first.
#[utoipa::path(
    get,
    path = "/v1/alerts/{id}/history",
    tag = "Alerts",
    params(
        ("id" = String, Path, description = "Alert ID"),
        HistoryParams
    ),
    responses(
        (status = 200, description = "Fire events", body = Vec<HistoryEntry>),
        (status = 404, description = "Unknown alert", body = ApiError)
    )
)]
async fn alert_history(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    match state
        .service
        .alert_history(&id, params.timestamp_gte, params.timestamp_lte)
    {
        Ok(entries) => success_response(StatusCode::OK, &trace_id, entries),
        Err(e) => monitor_error_response(&trace_id, &e),
    }
}

pub fn alert_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(create_alert, list_alerts))
        .routes(routes!(get_alert, update_alert))
        .routes(routes!(resolve_alert))
        .routes(routes!(alert_history))
}
