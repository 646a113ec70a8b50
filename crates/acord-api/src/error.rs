//! # API Error Types
//!
//! Errors raised outside the ACORD dispatch path: unknown routes, readiness
//! probes, panics and envelope build failures. They render as a JSON
//! [`ErrorBody`]. ACORD transactions themselves always answer with a
//! `Response` envelope, never with this type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// `{"error": {...}}` body for non-ACORD failures.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// `NOT_FOUND`, `INTERNAL_ERROR` or `SERVICE_UNAVAILABLE`.
    pub code: String,
    pub message: String,
}

/// Failure outside the envelope path, rendered as [`ErrorBody`].
#[derive(Error, Debug)]
pub enum AppError {
    /// No route matches (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Fault (500). The detail is logged; callers get a generic message.
    #[error("internal error: {0}")]
    Internal(String),

    /// The service cannot take traffic yet (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => crate::envelope::INTERNAL_DESCRIPTION.to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            Self::NotFound(_) => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<crate::envelope::BuildError> for AppError {
    fn from(err: crate::envelope::BuildError) -> Self {
        Self::Internal(err.to_string())
    }
}
