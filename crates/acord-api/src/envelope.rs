//! # Response Envelope Builder
//!
//! A [`ResponseEnvelope`] is the dispatcher's verdict on one request. It is
//! turned into wire bytes in three steps:
//!
//! 1. assemble a `Response` document (correlation id, `StatusCd`,
//!    `StatusDesc`, `ErrorCd`, `TransResult`, execution date and time);
//! 2. validate it against the success or error response schema, chosen by
//!    outcome;
//! 3. encode it in the negotiated [`WireFormat`].
//!
//! The representation comes from [`negotiate`] over the `Accept` header
//! alone. It never depends on the request's own `Content-Type`.

use acord_codec::CodecError;
use acord_core::temporal::{format_date, format_time};
use acord_core::{CanonicalDocument, DocumentError, Node, TransactionKind, TypeCode, WireFormat};
use acord_schema::node::is_xml_char;
use acord_schema::response::{failure_result, success_result, RESPONSE_ROOT};
use acord_schema::{summarize, validate, Method, SchemaNode, ValidationIssue};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Description returned for every internal fault.
pub const INTERNAL_DESCRIPTION: &str = "An internal error occurred";

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Accepted and handed off.
    Success,
    /// Body is not well-formed in its declared format, or the format is
    /// not supported.
    MalformedInput,
    /// Body parsed but does not conform to the form's schema.
    ValidationError,
    /// No form is registered for the path segment.
    UnknownTransactionKind,
    /// The form exists but is not served under this HTTP method.
    MethodNotAllowed,
    /// Anything unanticipated. Detail is logged, never returned.
    InternalError,
}

impl Outcome {
    /// Stable name, written to `ErrorCd` and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::MalformedInput => "MalformedInput",
            Self::ValidationError => "ValidationError",
            Self::UnknownTransactionKind => "UnknownTransactionKind",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::InternalError => "InternalError",
        }
    }

    /// Whether the caller can fix the request and retry.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedInput
                | Self::ValidationError
                | Self::UnknownTransactionKind
                | Self::MethodNotAllowed
        )
    }
}

/// Domain-level status code, aligned one-to-one with the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainStatus {
    /// "200": inquiry answered.
    Ok,
    /// "201": submission accepted.
    Created,
    /// "400"
    BadRequest,
    /// "404"
    NotFound,
    /// "405"
    MethodNotAllowed,
    /// "500"
    InternalError,
}

impl DomainStatus {
    /// Numeric code.
    pub fn code(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Created => 201,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::InternalError => 500,
        }
    }

    /// Success status for a form's disposition code.
    pub fn from_success_code(code: u16) -> Self {
        if code == 201 {
            Self::Created
        } else {
            Self::Ok
        }
    }

    /// Matching transport status.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Ok => StatusCode::OK,
            Self::Created => StatusCode::CREATED,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The dispatcher's verdict on one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    /// Resolved kind, if the path segment parsed.
    pub kind: Option<TransactionKind>,
    /// How the request ended.
    pub outcome: Outcome,
    /// Correlation identifier copied from the request, when present.
    pub correlation_id: Option<String>,
    /// Domain status.
    pub status: DomainStatus,
    /// Human-readable description.
    pub description: String,
    /// Validation issues, in walk order. Empty unless `ValidationError`.
    pub issues: Vec<ValidationIssue>,
    /// Method the form accepts, for `MethodNotAllowed`.
    pub allow: Option<Method>,
    /// Instant stamped into `TransExeDate` / `TransExeTime`.
    pub executed_at: DateTime<Utc>,
}

impl ResponseEnvelope {
    /// Successful outcome.
    pub fn success(
        kind: TransactionKind,
        status: DomainStatus,
        correlation_id: String,
        description: impl Into<String>,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: Some(kind),
            outcome: Outcome::Success,
            correlation_id: Some(correlation_id),
            status,
            description: description.into(),
            issues: Vec::new(),
            allow: None,
            executed_at,
        }
    }

    /// Failed outcome with no issues attached.
    pub fn failure(
        kind: Option<TransactionKind>,
        outcome: Outcome,
        status: DomainStatus,
        description: impl Into<String>,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            outcome,
            correlation_id: None,
            status,
            description: description.into(),
            issues: Vec::new(),
            allow: None,
            executed_at,
        }
    }

    /// Validation failure. The description is the joined issue summary.
    pub fn invalid(
        kind: TransactionKind,
        correlation_id: Option<String>,
        issues: Vec<ValidationIssue>,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: Some(kind),
            outcome: Outcome::ValidationError,
            correlation_id,
            status: DomainStatus::BadRequest,
            description: summarize(&issues),
            issues,
            allow: None,
            executed_at,
        }
    }

    /// Generic internal error.
    pub fn internal(kind: Option<TransactionKind>, executed_at: DateTime<Utc>) -> Self {
        Self::failure(
            kind,
            Outcome::InternalError,
            DomainStatus::InternalError,
            INTERNAL_DESCRIPTION,
            executed_at,
        )
    }

    /// Copy with every character XML cannot carry, in text that may come
    /// from the caller, replaced by U+FFFD.
    pub fn scrubbed(&self) -> Self {
        let issues = self
            .issues
            .iter()
            .map(|issue| ValidationIssue {
                path: scrub(&issue.path),
                kind: issue.kind,
                detail: scrub(&issue.detail),
            })
            .collect();
        Self {
            correlation_id: self.correlation_id.as_deref().map(scrub),
            description: scrub(&self.description),
            issues,
            ..self.clone()
        }
    }

    /// Assemble the `Response` document. `correlation_field` names the
    /// element that carries the correlation id; without it the id is
    /// omitted.
    pub fn to_document(
        &self,
        correlation_field: Option<&str>,
    ) -> Result<CanonicalDocument, DocumentError> {
        let mut root = Node::group(RESPONSE_ROOT);
        if let (Some(field), Some(id)) = (correlation_field, &self.correlation_id) {
            root.push(Node::text(field, id.as_str()))?;
        }
        root.push(Node::text("StatusCd", self.status.code().to_string()))?;
        root.push(Node::text("StatusDesc", self.description.as_str()))?;

        let mut result = Node::group("TransResult");
        if self.outcome == Outcome::Success {
            result.push(Node::code("ResultCode", success_result()))?;
        } else {
            root.push(Node::text("ErrorCd", self.outcome.as_str()))?;
            result.push(Node::code("ResultCode", failure_result()))?;
            if let Some(first) = self.issues.first() {
                result.push(Node::group_of(
                    "ResultInfo",
                    [
                        Node::code(
                            "ResultInfoCode",
                            TypeCode::new(first.kind.result_info_code(), first.kind.as_str()),
                        ),
                        Node::text("ResultInfoDesc", first.to_string()),
                    ],
                )?)?;
            }
        }
        root.push(result)?;
        root.push(Node::text("TransExeDate", format_date(&self.executed_at)))?;
        root.push(Node::text("TransExeTime", format_time(&self.executed_at)))?;
        Ok(CanonicalDocument::new(root))
    }
}

fn scrub(text: &str) -> String {
    text.chars()
        .map(|c| if is_xml_char(c) { c } else { char::REPLACEMENT_CHARACTER })
        .collect()
}

/// Failure while turning an envelope into bytes. Always an internal fault.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The response tree could not be assembled.
    #[error("response document assembly failed: {0}")]
    Document(#[from] DocumentError),

    /// The assembled document does not match its response schema.
    #[error("response document does not conform to its schema: {0}")]
    Nonconforming(String),

    /// The codec could not encode the document.
    #[error("response encoding failed: {0}")]
    Codec(#[from] CodecError),
}

/// Build response bytes for `envelope`, checked against `schema`.
pub fn build(
    envelope: &ResponseEnvelope,
    schema: &SchemaNode,
    correlation_field: Option<&str>,
    format: WireFormat,
) -> Result<Vec<u8>, BuildError> {
    let doc = envelope.to_document(correlation_field)?;
    let issues = validate(&doc, schema);
    if !issues.is_empty() {
        return Err(BuildError::Nonconforming(summarize(&issues)));
    }
    Ok(acord_codec::encode(&doc, format)?)
}

/// Pick the response representation from an `Accept` header.
///
/// Media ranges are ranked by `q` (ties keep header order). The first
/// range naming JSON or XML decides; wildcards count as JSON. Anything
/// else, including an absent or unparseable header, yields JSON.
pub fn negotiate(accept: Option<&str>) -> WireFormat {
    let Some(accept) = accept else {
        return WireFormat::Json;
    };

    let mut ranges: Vec<(f32, &str)> = accept
        .split(',')
        .filter_map(|range| {
            let mut parts = range.split(';');
            let media = parts.next()?.trim();
            let q = parts
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (q > 0.0 && !media.is_empty()).then_some((q, media))
        })
        .collect();
    ranges.sort_by(|a, b| b.0.total_cmp(&a.0));

    ranges
        .into_iter()
        .find_map(|(_, media)| {
            let essence = acord_core::format::media_essence(media);
            match essence.as_str() {
                "*/*" | "application/*" => Some(WireFormat::Json),
                other => WireFormat::from_media_type(other),
            }
        })
        .unwrap_or_default()
}
