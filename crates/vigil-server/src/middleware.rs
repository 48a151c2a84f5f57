use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::collections::HashMap;
use std::time::Instant;
use vigil_storage::NewMetric;

/// Records `api.request.duration` (milliseconds) and `api.request.count`
/// samples for every API request, labelled with endpoint, method and
/// status code. The samples go through the normal ingestion path, so
/// alerts can watch the API itself.
pub async fn api_metrics(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if path.starts_with("/docs") || path == "/v1/openapi.json" {
        return next.run(req).await;
    }
    let method = req.method().to_string();

    let start = Instant::now();
    let response = next.run(req).await;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let mut labels = HashMap::new();
    labels.insert("endpoint".to_string(), path);
    labels.insert("method".to_string(), method);
    labels.insert(
        "status_code".to_string(),
        response.status().as_u16().to_string(),
    );

    for (name, value) in [
        ("api.request.duration", elapsed_ms),
        ("api.request.count", 1.0),
    ] {
        let sample = NewMetric {
            name: name.to_string(),
            value,
            labels: labels.clone(),
            metadata: None,
        };
        if let Err(e) = state.service.record_metric(&sample) {
            tracing::warn!(metric = name, error = %e, "failed to record api metric");
        }
    }

    response
}
