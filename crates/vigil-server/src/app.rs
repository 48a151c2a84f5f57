use crate::state::AppState;
use crate::{api, logging, middleware as api_middleware};
use axum::http::HeaderValue;
use axum::middleware;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "vigil API",
        description = "vigil metric ingestion and threshold alerting REST API",
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Metrics", description = "Metric ingestion and queries"),
        (name = "Alerts", description = "Threshold alerts and fire history"),
        (name = "Summary", description = "Aggregated monitoring overview")
    )
)]
struct ApiDoc;

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        let values: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!(origin = %o, error = %e, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_http_app(state: AppState) -> Router {
    let (router, spec) = api::routes().split_for_parts();

    let mut merged_spec = ApiDoc::openapi();
    merged_spec.merge(spec);

    let cors = cors_layer(&state.config.cors_allowed_origins);

    let mut router = router
        .with_state(state.clone())
        .merge(SwaggerUi::new("/docs").url("/v1/openapi.json", merged_spec));

    if state.config.api_metrics_enabled {
        router = router.layer(middleware::from_fn_with_state(
            state,
            api_middleware::api_metrics,
        ));
    }

    router
        .layer(cors)
        .layer(middleware::from_fn(logging::trace_requests))
}
