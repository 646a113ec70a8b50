//! # acord-api: ACORD Transaction Gateway
//!
//! Accepts ACORD insurance transactions over HTTP as JSON or XML, resolves
//! the form from the path, validates the document against the registered
//! schema, hands it to a downstream queue, and answers with an ACORD
//! `Response` envelope in the representation the caller asked for.
//!
//! ## API Surface
//!
//! | Route                  | Module                 | Purpose                      |
//! |------------------------|------------------------|------------------------------|
//! | `POST\|PUT /acord/{kind}` | [`routes::acord`]   | Transaction dispatch         |
//! | `GET /openapi.json`, `/`  | [`openapi`]         | Registry-generated OpenAPI   |
//! | `GET /health/*`        | this module            | Liveness and readiness       |
//! | `GET /metrics`         | this module            | Prometheus exposition        |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! CatchPanic → TraceLayer → Cors → MetricsMiddleware → BodyLimit → Handler
//! ```
//!
//! Health probes and `/metrics` are mounted outside the stack.

pub mod delivery;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use std::any::Any;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderName, Method, Uri};
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};

use crate::error::AppError;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::acord::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(cors())
        .layer(middleware::tracing_layer::layer())
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state.clone());

    let mut health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));
    if state.metrics.is_some() {
        health = health.route("/metrics", get(prometheus_metrics));
    }

    Router::new()
        .merge(health.with_state(state))
        .merge(api)
        .fallback(not_found)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-amz-date"),
            HeaderName::from_static("x-api-key"),
            HeaderName::from_static("x-amz-security-token"),
        ])
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    AppError::Internal(format!("handler panicked: {detail}")).into_response()
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {uri}"))
}

/// Liveness probe: always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/liveness",
    tag = "health",
    responses((status = 200, description = "Process is running", body = String))
)]
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: returns 200 once at least one form is registered.
#[utoipa::path(
    get,
    path = "/health/readiness",
    tag = "health",
    responses(
        (status = 200, description = "Ready to accept transactions", body = String),
        (status = 503, description = "No forms registered", body = crate::error::ErrorBody)
    )
)]
async fn readiness(State(state): State<AppState>) -> Result<&'static str, AppError> {
    if state.registry().is_empty() {
        return Err(AppError::ServiceUnavailable(
            "no transaction forms are registered".to_string(),
        ));
    }
    Ok("ready")
}

async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => AppError::NotFound("metrics are disabled".to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn panic_becomes_generic_500() {
        let response = panic_response(Box::new("index out of bounds"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("INTERNAL_ERROR"));
        assert!(!body.contains("index out of bounds"));
    }
}
