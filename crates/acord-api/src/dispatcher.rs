//! # Transaction Dispatcher
//!
//! Drives one request through resolve, decode, validate, correlate, render
//! and deliver. Each step either advances or ends the request with an
//! error [`ResponseEnvelope`]:
//!
//! | Step      | Failure                           | Status |
//! |-----------|-----------------------------------|--------|
//! | Resolve   | unknown kind / wrong method       | 404 / 405 |
//! | Decode    | unsupported or malformed body     | 400    |
//! | Validate  | any `ValidationIssue`             | 400    |
//! | Correlate | absent or empty correlation id    | 400    |
//! | Render    | success envelope cannot be built  | 500    |
//! | Deliver   | sink refused the message          | 500    |
//!
//! A message reaches the sink only once its success response exists.
//!
//! Everything here is synchronous and in-memory. The dispatcher holds only
//! shared read-only state, so one instance serves all requests
//! concurrently.

use std::sync::Arc;

use acord_core::{CanonicalDocument, Clock, TransactionKind, WireFormat};
use acord_schema::{Method, SchemaRegistry};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};

use crate::delivery::{DeliveryMessage, DeliverySink};
use crate::envelope::{
    build, negotiate, BuildError, DomainStatus, Outcome, ResponseEnvelope,
};

/// What the HTTP layer hands the dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct InboundRequest<'a> {
    /// Path segment naming the transaction kind (`103`, `ACORD103`).
    pub path_segment: &'a str,
    /// HTTP method.
    pub method: Method,
    /// Raw `Content-Type` header.
    pub content_type: Option<&'a str>,
    /// Raw `Accept` header.
    pub accept: Option<&'a str>,
    /// Body bytes.
    pub body: &'a [u8],
}

/// A decoded request and what was negotiated for it.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    /// Resolved transaction kind.
    pub kind: TransactionKind,
    /// Format the body arrived in.
    pub content_format: WireFormat,
    /// Format the response will be written in.
    pub accept: WireFormat,
    /// Decoded body.
    pub document: CanonicalDocument,
}

/// Encoded response, ready for the transport.
#[derive(Debug, Clone)]
pub struct RenderedResponse {
    /// Transport status.
    pub status: StatusCode,
    /// Body representation.
    pub format: WireFormat,
    /// Encoded body.
    pub body: Vec<u8>,
    /// Value for the `Allow` header on 405.
    pub allow: Option<Method>,
}

impl IntoResponse for RenderedResponse {
    fn into_response(self) -> Response {
        let mut response = (
            self.status,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(self.format.media_type()),
            )],
            self.body,
        )
            .into_response();
        if let Some(method) = self.allow {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(method.as_str()));
        }
        response
    }
}

/// A request that passed every check, with its verdict and the message
/// still to be delivered.
struct Accepted {
    envelope: ResponseEnvelope,
    message: DeliveryMessage,
}

/// Request state machine over an injected registry, clock and sink.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<SchemaRegistry>,
    clock: Arc<dyn Clock>,
    delivery: Arc<dyn DeliverySink>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("forms", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher.
    pub fn new(
        registry: Arc<SchemaRegistry>,
        clock: Arc<dyn Clock>,
        delivery: Arc<dyn DeliverySink>,
    ) -> Self {
        Self {
            registry,
            clock,
            delivery,
        }
    }

    /// The registry requests are resolved against.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Dispatch `request` and encode the verdict in the negotiated format.
    ///
    /// An accepted request is rendered before it is handed to the sink, so
    /// a message is never delivered for a request that then answers 500.
    pub fn respond(&self, request: &InboundRequest<'_>) -> Result<RenderedResponse, BuildError> {
        let format = negotiate(request.accept);
        let now = self.clock.now();
        let envelope = match self.process(request, now) {
            Err(early) => early,
            Ok(accepted) => match self.try_render(&accepted.envelope, format) {
                Ok(rendered) => {
                    let envelope = self.deliver(accepted);
                    if envelope.outcome == Outcome::Success {
                        record(&envelope);
                        return Ok(rendered);
                    }
                    envelope
                }
                Err(e) => {
                    tracing::error!(
                        kind = ?accepted.envelope.kind,
                        error = %e,
                        "success envelope could not be built; message not delivered"
                    );
                    ResponseEnvelope::internal(accepted.envelope.kind, now)
                }
            },
        };
        record(&envelope);
        self.render(&envelope, format)
    }

    /// Run the state machine without rendering, delivering accepted
    /// requests. Never fails: every path ends in an envelope.
    pub fn dispatch(&self, request: &InboundRequest<'_>) -> ResponseEnvelope {
        let now = self.clock.now();
        let envelope = match self.process(request, now) {
            Ok(accepted) => self.deliver(accepted),
            Err(early) => early,
        };
        record(&envelope);
        envelope
    }

    /// `Err` carries the envelope of a request that stopped early.
    fn process(
        &self,
        request: &InboundRequest<'_>,
        now: DateTime<Utc>,
    ) -> Result<Accepted, ResponseEnvelope> {
        // Resolve
        let kind = TransactionKind::parse(request.path_segment).map_err(|e| {
            ResponseEnvelope::failure(
                None,
                Outcome::UnknownTransactionKind,
                DomainStatus::NotFound,
                e.to_string(),
                now,
            )
        })?;
        let form = self.registry.lookup(kind).map_err(|e| {
            ResponseEnvelope::failure(
                Some(kind),
                Outcome::UnknownTransactionKind,
                DomainStatus::NotFound,
                e.to_string(),
                now,
            )
        })?;
        if form.method() != request.method {
            let mut envelope = ResponseEnvelope::failure(
                Some(kind),
                Outcome::MethodNotAllowed,
                DomainStatus::MethodNotAllowed,
                format!("{kind} accepts {} requests only", form.method()),
                now,
            );
            envelope.allow = Some(form.method());
            return Err(envelope);
        }

        // Decode
        let bad_input = |reason: String| {
            ResponseEnvelope::failure(
                Some(kind),
                Outcome::MalformedInput,
                DomainStatus::BadRequest,
                reason,
                now,
            )
        };
        let content_format = WireFormat::from_content_type(request.content_type)
            .map_err(|e| bad_input(e.to_string()))?;
        let document = acord_codec::decode_with(request.body, content_format, form.request())
            .map_err(|e| {
                if e.is_malformed() {
                    bad_input(e.to_string())
                } else {
                    tracing::error!(kind = %kind, error = %e, "request decoding failed");
                    ResponseEnvelope::internal(Some(kind), now)
                }
            })?;
        let inbound = RequestEnvelope {
            kind,
            content_format,
            accept: negotiate(request.accept),
            document,
        };

        // Validate, then correlate
        let issues = form.check_request(&inbound.document);
        let correlation_id = form.correlation_id(&inbound.document).map(str::to_owned);
        let correlation_id = match correlation_id {
            Some(id) if issues.is_empty() => id,
            id => return Err(ResponseEnvelope::invalid(kind, id, issues, now)),
        };

        // Accept
        tracing::info!(
            kind = %kind,
            correlation_id = %correlation_id,
            content_format = %inbound.content_format,
            accept = %inbound.accept,
            "transaction accepted"
        );
        let envelope = ResponseEnvelope::success(
            kind,
            DomainStatus::from_success_code(form.disposition().status_code()),
            correlation_id.clone(),
            form.description(),
            now,
        );
        let message = DeliveryMessage::new(kind, correlation_id.as_str(), now, inbound.document);
        Ok(Accepted { envelope, message })
    }

    /// Hand an accepted request to the sink.
    fn deliver(&self, accepted: Accepted) -> ResponseEnvelope {
        let Accepted { envelope, message } = accepted;
        match self.delivery.submit(message) {
            Ok(()) => envelope,
            Err(e) => {
                tracing::error!(
                    kind = ?envelope.kind,
                    correlation_id = ?envelope.correlation_id,
                    error = %e,
                    "downstream delivery failed"
                );
                let mut failed = ResponseEnvelope::internal(envelope.kind, envelope.executed_at);
                failed.correlation_id = envelope.correlation_id;
                failed
            }
        }
    }

    /// Encode `envelope`. If that fails, retry with caller-supplied text
    /// scrubbed, keeping the outcome and status; if that fails too, fall
    /// back to a generic internal error envelope. Only a failure of that
    /// last step is returned.
    pub fn render(
        &self,
        envelope: &ResponseEnvelope,
        format: WireFormat,
    ) -> Result<RenderedResponse, BuildError> {
        if envelope.outcome == Outcome::InternalError {
            return self.try_render(envelope, format);
        }
        let err = match self.try_render(envelope, format) {
            Ok(rendered) => return Ok(rendered),
            Err(e) => e,
        };
        tracing::warn!(
            outcome = envelope.outcome.as_str(),
            error = %err,
            "response envelope could not be built; retrying with scrubbed text"
        );
        match self.try_render(&envelope.scrubbed(), format) {
            Ok(rendered) => Ok(rendered),
            Err(e) => {
                tracing::error!(
                    outcome = envelope.outcome.as_str(),
                    error = %e,
                    "response envelope could not be built"
                );
                let fallback = ResponseEnvelope::internal(envelope.kind, envelope.executed_at);
                self.try_render(&fallback, format)
            }
        }
    }

    fn try_render(
        &self,
        envelope: &ResponseEnvelope,
        format: WireFormat,
    ) -> Result<RenderedResponse, BuildError> {
        let form = envelope.kind.and_then(|k| self.registry.lookup(k).ok());
        let (schema, correlation_field) = match (envelope.outcome, form) {
            (Outcome::Success, Some(form)) => (form.response(), Some(form.correlation_field())),
            (_, Some(form)) => (form.error_response(), Some(form.correlation_field())),
            (_, None) => (self.registry.error_response(), None),
        };
        let body = build(envelope, schema, correlation_field, format)?;
        Ok(RenderedResponse {
            status: envelope.status.http_status(),
            format,
            body,
            allow: envelope.allow,
        })
    }
}

fn record(envelope: &ResponseEnvelope) {
    let kind = envelope
        .kind
        .map_or_else(|| "unresolved".to_string(), |k| k.to_string());
    if envelope.outcome.is_caller_error() {
        tracing::warn!(
            kind = %kind,
            outcome = envelope.outcome.as_str(),
            status = envelope.status.code(),
            description = %envelope.description,
            "request rejected"
        );
    }
    metrics::counter!(
        "acord_requests_total",
        "kind" => kind,
        "outcome" => envelope.outcome.as_str()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::delivery::DeliveryError;
    use acord_core::FixedClock;
    use acord_schema::{FormSchema, IssueKind};

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<DeliveryMessage>>);

    impl DeliverySink for RecordingSink {
        fn submit(&self, message: DeliveryMessage) -> Result<(), DeliveryError> {
            self.0.lock().unwrap().push(message);
            Ok(())
        }
    }

    struct ClosedSink;

    impl DeliverySink for ClosedSink {
        fn submit(&self, _message: DeliveryMessage) -> Result<(), DeliveryError> {
            Err(DeliveryError::Closed)
        }
    }

    const NEW_BUSINESS: &str = r#"{"ACORD":{"InsuranceSvcRq":{"RqUID":"abc-123","TransactionRequestDt":"2024-08-30","NewBusiness":{"PersPkgPolicy":{"LOBCd":"AUTO"}}}}}"#;

    fn dispatcher_with(sink: Arc<dyn DeliverySink>) -> Dispatcher {
        Dispatcher::new(
            Arc::new(SchemaRegistry::standard().unwrap()),
            Arc::new(FixedClock::from_rfc3339("2024-08-30T15:30:00Z").unwrap()),
            sink,
        )
    }

    fn post<'a>(segment: &'a str, body: &'a str) -> InboundRequest<'a> {
        InboundRequest {
            path_segment: segment,
            method: Method::Post,
            content_type: Some("application/json"),
            accept: None,
            body: body.as_bytes(),
        }
    }

    #[test]
    fn accepted_submission_is_delivered() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_with(sink.clone());
        let envelope = dispatcher.dispatch(&post("103", NEW_BUSINESS));

        assert_eq!(envelope.outcome, Outcome::Success);
        assert_eq!(envelope.status, DomainStatus::Created);
        assert_eq!(envelope.correlation_id.as_deref(), Some("abc-123"));

        let delivered = sink.0.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].kind, TransactionKind::ACORD_103);
        assert_eq!(delivered[0].correlation_id, "abc-123");
    }

    #[test]
    fn inquiry_answers_with_200() {
        let dispatcher = dispatcher_with(Arc::new(RecordingSink::default()));
        let body = r#"{"ACORD":{"InsuranceSvcRq":{"RqUID":"q-1","TransactionRequestDt":"2024-08-30","NewBusiness":{"PersPkgPolicy":{"LOBCd":"AUTO"}}}}}"#;
        let envelope = dispatcher.dispatch(&post("ACORD203", body));
        assert_eq!(envelope.status, DomainStatus::Ok);
        assert!(envelope.description.contains("inquiry accepted"));
    }

    #[test]
    fn empty_correlation_id_is_missing_required() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_with(sink.clone());
        let body = NEW_BUSINESS.replace("abc-123", "  ");
        let envelope = dispatcher.dispatch(&post("103", &body));

        assert_eq!(envelope.outcome, Outcome::ValidationError);
        assert_eq!(envelope.issues.len(), 1);
        assert_eq!(envelope.issues[0].kind, IssueKind::MissingRequired);
        assert_eq!(envelope.issues[0].path, "ACORD.InsuranceSvcRq.RqUID");
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn validation_failure_echoes_correlation_id() {
        let dispatcher = dispatcher_with(Arc::new(RecordingSink::default()));
        let body = NEW_BUSINESS.replace("2024-08-30", "2024-02-30");
        let envelope = dispatcher.dispatch(&post("103", &body));
        assert_eq!(envelope.outcome, Outcome::ValidationError);
        assert_eq!(envelope.correlation_id.as_deref(), Some("abc-123"));
        assert_eq!(envelope.issues[0].kind, IssueKind::MalformedDate);
    }

    #[test]
    fn wrong_method_is_405_with_allow() {
        let dispatcher = dispatcher_with(Arc::new(RecordingSink::default()));
        let envelope = dispatcher.dispatch(&post("1125", "{}"));
        assert_eq!(envelope.outcome, Outcome::MethodNotAllowed);
        assert_eq!(envelope.allow, Some(Method::Put));

        let rendered = dispatcher.render(&envelope, WireFormat::Json).unwrap();
        assert_eq!(rendered.status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn unsupported_content_type_is_malformed_input() {
        let dispatcher = dispatcher_with(Arc::new(RecordingSink::default()));
        let mut request = post("103", NEW_BUSINESS);
        request.content_type = Some("text/plain");
        let envelope = dispatcher.dispatch(&request);
        assert_eq!(envelope.outcome, Outcome::MalformedInput);
        assert_eq!(envelope.status, DomainStatus::BadRequest);
    }

    #[test]
    fn unparseable_segment_is_unknown_kind() {
        let dispatcher = dispatcher_with(Arc::new(RecordingSink::default()));
        let envelope = dispatcher.dispatch(&post("not-a-form", NEW_BUSINESS));
        assert_eq!(envelope.outcome, Outcome::UnknownTransactionKind);
        assert_eq!(envelope.kind, None);
        let rendered = dispatcher.render(&envelope, WireFormat::Xml).unwrap();
        assert_eq!(rendered.status, StatusCode::NOT_FOUND);
        assert!(String::from_utf8(rendered.body)
            .unwrap()
            .contains("<ErrorCd>UnknownTransactionKind</ErrorCd>"));
    }

    #[test]
    fn refused_delivery_is_generic_internal_error() {
        let dispatcher = dispatcher_with(Arc::new(ClosedSink));
        let envelope = dispatcher.dispatch(&post("103", NEW_BUSINESS));
        assert_eq!(envelope.outcome, Outcome::InternalError);
        assert_eq!(envelope.status, DomainStatus::InternalError);
        assert!(!envelope.description.contains("closed"));
    }

    #[test]
    fn unrenderable_success_falls_back_to_internal_error() {
        let dispatcher = dispatcher_with(Arc::new(RecordingSink::default()));
        let envelope = ResponseEnvelope::success(
            TransactionKind::parse("999").unwrap(),
            DomainStatus::Created,
            "x".into(),
            "ok",
            Utc::now(),
        );
        let rendered = dispatcher.render(&envelope, WireFormat::Json).unwrap();
        assert_eq!(rendered.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_service_request_is_a_single_issue() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_with(sink.clone());
        let envelope = dispatcher.dispatch(&post("103", r#"{"ACORD":{}}"#));

        assert_eq!(envelope.outcome, Outcome::ValidationError);
        assert_eq!(envelope.issues.len(), 1);
        assert_eq!(envelope.issues[0].path, "ACORD.InsuranceSvcRq");
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn control_character_in_value_is_rejected_before_delivery() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_with(sink.clone());
        let body = NEW_BUSINESS.replace("abc-123", "abc\\u0001");
        let mut request = post("103", &body);
        request.accept = Some("application/xml");

        let rendered = dispatcher.respond(&request).unwrap();
        assert_eq!(rendered.status, StatusCode::BAD_REQUEST);
        assert_eq!(rendered.format, WireFormat::Xml);
        let xml = String::from_utf8(rendered.body).unwrap();
        assert!(xml.contains("<ErrorCd>ValidationError</ErrorCd>"));
        assert!(xml.contains("TypeMismatch at ACORD.InsuranceSvcRq.RqUID"));
        assert!(!xml.contains("<RqUID>"));
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn control_character_in_root_name_stays_a_caller_error() {
        let dispatcher = dispatcher_with(Arc::new(RecordingSink::default()));
        let mut request = post("103", r#"{"A\u0001":{}}"#);
        request.accept = Some("application/xml");

        let rendered = dispatcher.respond(&request).unwrap();
        assert_eq!(rendered.status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8(rendered.body)
            .unwrap()
            .contains("<ErrorCd>ValidationError</ErrorCd>"));
    }

    #[test]
    fn unrenderable_success_is_not_delivered() {
        let standard = SchemaRegistry::standard().unwrap();
        let mut spec = standard
            .lookup(TransactionKind::ACORD_103)
            .unwrap()
            .spec()
            .clone();
        spec.description = "submitted\u{1}".to_string();
        let registry = SchemaRegistry::new([FormSchema::new(spec).unwrap()]).unwrap();

        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            Arc::new(FixedClock::from_rfc3339("2024-08-30T15:30:00Z").unwrap()),
            sink.clone(),
        );
        let rendered = dispatcher.respond(&post("103", NEW_BUSINESS)).unwrap();
        assert_eq!(rendered.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn respond_delivers_after_rendering() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher_with(sink.clone());
        let rendered = dispatcher.respond(&post("103", NEW_BUSINESS)).unwrap();
        assert_eq!(rendered.status, StatusCode::CREATED);
        assert_eq!(sink.0.lock().unwrap().len(), 1);
    }
}
