//! # ACORD Transaction Endpoint
//!
//! `POST|PUT /acord/{kind}` hands the raw request to the
//! [`Dispatcher`](crate::dispatcher::Dispatcher) and writes back whatever
//! envelope it renders. Both methods are routed for every kind so that a
//! wrong method on a known form yields an ACORD 405 envelope rather than
//! an empty router rejection.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Method as HttpMethod};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;

use acord_schema::Method;

use crate::dispatcher::InboundRequest;
use crate::error::AppError;
use crate::state::AppState;

/// Build the ACORD router.
pub fn router() -> Router<AppState> {
    Router::new().route("/acord/{kind}", post(submit).put(submit))
}

async fn submit(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    method: HttpMethod,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let method = if method == HttpMethod::PUT {
        Method::Put
    } else {
        Method::Post
    };
    let header_str = |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok());

    let request = InboundRequest {
        path_segment: &kind,
        method,
        content_type: header_str(header::CONTENT_TYPE),
        accept: header_str(header::ACCEPT),
        body: &body,
    };

    match state.dispatcher.respond(&request) {
        Ok(rendered) => rendered.into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}
