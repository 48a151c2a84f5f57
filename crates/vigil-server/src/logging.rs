use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use rand::Rng;
use std::time::Instant;

/// Response header carrying the request's trace id.
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Per-request trace id, stored in request extensions.
///
/// Handlers pull it out with `Extension<TraceId>` and echo it in the
/// response envelope so a client error report can be matched to the
/// server log line.
#[derive(Clone)]
pub struct TraceId(pub String);

impl TraceId {
    fn generate() -> Self {
        TraceId(format!("{:016x}", rand::thread_rng().gen::<u64>()))
    }
}

impl std::ops::Deref for TraceId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

const SNIPPET_CHARS: usize = 200;
const MAX_LOGGED_REQUEST_BYTES: usize = 1024 * 1024;

/// First `SNIPPET_CHARS` characters of a body, lossily decoded.
fn snippet(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    let mut out = String::new();
    for (seen, ch) in text.chars().enumerate() {
        if seen == SNIPPET_CHARS {
            out.push_str("...");
            break;
        }
        out.push(ch);
    }
    Some(out)
}

async fn buffer(body: Body, limit: usize) -> Bytes {
    axum::body::to_bytes(body, limit).await.unwrap_or_default()
}

/// Tags every request with a trace id and emits one structured log
/// event when it completes. Mutating requests get a body snippet on the
/// way in; error responses get one on the way out.
pub async fn trace_requests(mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    // Swagger UI assets and the schema are noise.
    if path.starts_with("/docs") || path == "/v1/openapi.json" {
        return next.run(req).await;
    }

    let trace = TraceId::generate();
    req.extensions_mut().insert(trace.clone());

    let method = req.method().clone();
    let target = match req.uri().query() {
        Some(q) => format!("{path}?{q}"),
        None => path,
    };

    let mut request_body = None;
    if matches!(method.as_str(), "POST" | "PUT" | "PATCH") {
        let (parts, body) = req.into_parts();
        let bytes = buffer(body, MAX_LOGGED_REQUEST_BYTES).await;
        request_body = snippet(&bytes);
        req = Request::from_parts(parts, Body::from(bytes));
    }

    let start = Instant::now();
    let response = next.run(req).await;
    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    // Error payloads carry the context worth keeping, so only those
    // bodies get read back and logged.
    let mut response = if status.is_client_error() || status.is_server_error() {
        let (parts, body) = response.into_parts();
        let bytes = buffer(body, usize::MAX).await;
        let detail = snippet(&bytes).unwrap_or_default();
        if status.is_server_error() {
            tracing::error!(
                trace_id = %trace.0,
                method = %method,
                path = %target,
                status = status.as_u16(),
                latency_ms,
                request = request_body.as_deref().unwrap_or(""),
                response = %detail,
                "request failed"
            );
        } else {
            tracing::warn!(
                trace_id = %trace.0,
                method = %method,
                path = %target,
                status = status.as_u16(),
                latency_ms,
                request = request_body.as_deref().unwrap_or(""),
                response = %detail,
                "request rejected"
            );
        }
        Response::from_parts(parts, Body::from(bytes))
    } else {
        tracing::info!(
            trace_id = %trace.0,
            method = %method,
            path = %target,
            status = status.as_u16(),
            latency_ms,
            request = request_body.as_deref().unwrap_or(""),
            "request served"
        );
        response
    };

    if let Ok(value) = HeaderValue::from_str(&trace) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}
