//! # HTTP Metrics
//!
//! Records every request through the `metrics` facade:
//!
//! - `acord_http_requests_total{method, status}`
//! - `acord_http_request_duration_seconds{method}`
//!
//! Exposition is the Prometheus recorder's job (see `/metrics`). Without an
//! installed recorder these calls are no-ops.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Axum middleware that counts requests and records their latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_owned();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        "acord_http_requests_total",
        "method" => method.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!("acord_http_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());

    response
}
