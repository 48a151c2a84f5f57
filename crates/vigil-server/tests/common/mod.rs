#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;
use vigil_monitor::MonitoringService;
use vigil_server::app;
use vigil_server::config::{CollectorConfig, ServerConfig};
use vigil_server::state::AppState;
use vigil_storage::store::SqliteStore;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

pub fn build_test_context() -> Result<TestContext> {
    // API self-metrics off by default so count assertions only see the
    // samples a test ingests itself.
    build_test_context_with(false)
}

pub fn build_test_context_with(api_metrics_enabled: bool) -> Result<TestContext> {
    build_test_context_from(ServerConfig {
        api_metrics_enabled,
        ..ServerConfig::default()
    })
}

/// Builds the app from an arbitrary config; the database always lands
/// in a fresh temp dir and the collector loop stays off.
pub fn build_test_context_from(mut config: ServerConfig) -> Result<TestContext> {
    let temp_dir = tempfile::tempdir()?;
    let db_path = temp_dir.path().join("vigil.db");
    config.db_path = db_path.to_string_lossy().to_string();
    config.collector = CollectorConfig {
        enabled: false,
        interval_secs: 30,
        process_metrics: false,
    };

    let store = Arc::new(SqliteStore::open(&db_path)?);
    let service = Arc::new(
        MonitoringService::new(store.clone(), store.clone(), store.clone())
            .with_evaluator(config.evaluator()),
    );

    let state = AppState {
        service,
        start_time: Utc::now(),
        config: Arc::new(config),
    };

    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
    })
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    let req_body = body.unwrap_or(Value::Null).to_string();
    let req = builder
        .body(Body::from(req_body))
        .expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
) -> (StatusCode, Value, Option<String>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");
    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub fn assert_ok_envelope(body: &Value) {
    assert_eq!(body["err_code"], 0, "expected success envelope: {body}");
    assert_eq!(body["err_msg"], "success");
}

pub fn assert_err_envelope(body: &Value, err_code: i64) {
    assert_eq!(body["err_code"], err_code, "unexpected envelope: {body}");
    assert!(body["data"].is_null());
}

/// Creates an alert over the API and returns its id.
pub async fn create_alert(
    app: &axum::Router,
    metric_name: &str,
    condition: &str,
    threshold: f64,
    severity: &str,
) -> String {
    let (status, body, _) = request_json(
        app,
        "POST",
        "/v1/alerts",
        Some(serde_json::json!({
            "metric_name": metric_name,
            "condition": condition,
            "threshold": threshold,
            "severity": severity,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "alert create failed: {body}");
    body["data"]["id"]
        .as_str()
        .expect("alert id should exist")
        .to_string()
}

/// Ingests one sample, asserting the 201 envelope, and returns `data`.
pub async fn ingest_metric(app: &axum::Router, name: &str, value: f64) -> Value {
    let (status, body, _) = request_json(
        app,
        "POST",
        "/v1/metrics",
        Some(serde_json::json!({ "name": name, "value": value })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "ingest failed: {body}");
    assert_ok_envelope(&body);
    body["data"].clone()
}
