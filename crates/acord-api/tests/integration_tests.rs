//! # Integration Tests for acord-api
//!
//! Drives the assembled router end to end: transaction dispatch in both
//! representations, every error outcome, content negotiation, delivery
//! hand-off, health probes, OpenAPI generation and CORS preflight.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tokio::sync::mpsc::Receiver;
use tower::ServiceExt;

use acord_api::delivery::{DeliveryMessage, QueueSink};
use acord_api::state::{AppConfig, AppState};
use acord_core::{FixedClock, TransactionKind};
use acord_schema::SchemaRegistry;

const NEW_BUSINESS: &str = r#"{"ACORD":{"InsuranceSvcRq":{"RqUID":"abc-123","TransactionRequestDt":"2024-08-30","NewBusiness":{"PersPkgPolicy":{"LOBCd":"AUTO"}}}}}"#;

const POLICY_CHANGE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TXLife>
  <TXLifeRequest>
    <TransRefGUID>guid-1125</TransRefGUID>
    <TransType tc="186">Policy Change</TransType>
    <TransExeDate>2024-08-30</TransExeDate>
    <OLifE><Holding><Policy><PolNumber>P-100</PolNumber></Policy></Holding></OLifE>
  </TXLifeRequest>
</TXLife>"#;

/// Helper: build state over the built-in forms with a frozen clock.
fn test_state(config: AppConfig, capacity: usize) -> (AppState, Receiver<DeliveryMessage>) {
    let (sink, receiver) = QueueSink::channel(capacity);
    let state = AppState::new(
        config,
        SchemaRegistry::standard().unwrap(),
        Arc::new(FixedClock::from_rfc3339("2024-08-30T15:30:00Z").unwrap()),
        Arc::new(sink),
    );
    (state, receiver)
}

/// Helper: build the test app. Keep the receiver alive for the test.
fn test_app() -> (axum::Router, Receiver<DeliveryMessage>) {
    let (state, receiver) = test_state(AppConfig::default(), 64);
    (acord_api::app(state), receiver)
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Helper: read response body as JSON.
async fn body_json(response: axum::http::Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

fn submit(method: &str, uri: &str, content_type: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body.to_owned()))
        .unwrap()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let (app, _rx) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/liveness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let (app, _rx) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/readiness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

#[tokio::test]
async fn test_readiness_fails_without_forms() {
    let (sink, _rx) = QueueSink::channel(1);
    let state = AppState::new(
        AppConfig::default(),
        SchemaRegistry::new(Vec::new()).unwrap(),
        Arc::new(FixedClock::from_rfc3339("2024-08-30T15:30:00Z").unwrap()),
        Arc::new(sink),
    );
    let response = acord_api::app(state)
        .oneshot(
            Request::builder()
                .uri("/health/readiness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"]["code"], "SERVICE_UNAVAILABLE");
}

// -- Accepted Transactions ----------------------------------------------------

#[tokio::test]
async fn test_new_business_json_is_accepted() {
    let (app, mut rx) = test_app();
    let response = app
        .oneshot(submit("POST", "/acord/103", "application/json", NEW_BUSINESS))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(
        body_string(response).await,
        r#"{"Response":{"RqUID":"abc-123","StatusCd":"201","StatusDesc":"ACORD 103 submitted successfully","TransResult":{"ResultCode":{"tc":"1","value":"Success"}},"TransExeDate":"2024-08-30","TransExeTime":"15:30:00"}}"#
    );

    let delivered = rx.try_recv().unwrap();
    assert_eq!(delivered.kind, TransactionKind::ACORD_103);
    assert_eq!(delivered.correlation_id, "abc-123");
    assert_eq!(delivered.document.root().name(), "ACORD");
}

#[tokio::test]
async fn test_policy_change_xml_is_accepted_with_put() {
    let (app, _rx) = test_app();
    let response = app
        .oneshot(submit("PUT", "/acord/1125", "application/xml", POLICY_CHANGE_XML))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["Response"]["TransRefGUID"], "guid-1125");
    assert_eq!(json["Response"]["StatusCd"], "201");
    assert_eq!(
        json["Response"]["StatusDesc"],
        "ACORD 1125 policy change submitted successfully"
    );
}

#[tokio::test]
async fn test_inquiry_answers_200() {
    let (app, _rx) = test_app();
    let body = r#"{"ACORD":{"InsuranceSvcRq":{"RqUID":"q-1","TransactionRequestDt":"2024-08-30","NewBusiness":{"PersPkgPolicy":{"LOBCd":"AUTO"}}}}}"#;
    let response = app
        .oneshot(submit("POST", "/acord/203", "application/json", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["Response"]["StatusCd"], "200");
}

#[tokio::test]
async fn test_prefixed_path_segment_resolves() {
    let (app, _rx) = test_app();
    let response = app
        .oneshot(submit("POST", "/acord/ACORD103", "application/json", NEW_BUSINESS))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

// -- Content Negotiation ------------------------------------------------------

#[tokio::test]
async fn test_accept_xml_yields_xml_for_json_request() {
    let (app, _rx) = test_app();
    let mut request = submit("POST", "/acord/103", "application/json", NEW_BUSINESS);
    request
        .headers_mut()
        .insert("accept", "application/xml".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["content-type"], "application/xml");
    let body = body_string(response).await;
    assert!(body.starts_with("<?xml"), "{body}");
    assert!(body.contains("<RqUID>abc-123</RqUID>"));
    assert!(body.contains(r#"<ResultCode tc="1">Success</ResultCode>"#));
}

#[tokio::test]
async fn test_xml_request_without_accept_yields_json() {
    let (app, _rx) = test_app();
    let response = app
        .oneshot(submit("PUT", "/acord/1125", "text/xml", POLICY_CHANGE_XML))
        .await
        .unwrap();
    assert_eq!(response.headers()["content-type"], "application/json");
}

// -- Rejected Transactions ----------------------------------------------------

#[tokio::test]
async fn test_missing_request_date_is_missing_required() {
    let (app, mut rx) = test_app();
    let body = r#"{"ACORD":{"InsuranceSvcRq":{"RqUID":"abc-123","NewBusiness":{"PersPkgPolicy":{"LOBCd":"AUTO"}}}}}"#;
    let response = app
        .oneshot(submit("POST", "/acord/103", "application/json", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    let envelope = &json["Response"];
    assert_eq!(envelope["StatusCd"], "400");
    assert_eq!(envelope["ErrorCd"], "ValidationError");
    assert_eq!(envelope["RqUID"], "abc-123");
    assert_eq!(
        envelope["TransResult"]["ResultInfo"]["ResultInfoCode"],
        serde_json::json!({"tc": "1", "value": "MissingRequired"})
    );
    assert_eq!(
        envelope["TransResult"]["ResultInfo"]["ResultInfoDesc"],
        "MissingRequired at ACORD.InsuranceSvcRq.TransactionRequestDt: required field is absent"
    );
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_every_missing_field_is_reported() {
    let (app, _rx) = test_app();
    let body = r#"{"ACORD":{"InsuranceSvcRq":{"RqUID":"abc-123"}}}"#;
    let response = app
        .oneshot(submit("POST", "/acord/103", "application/json", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    let summary = json["Response"]["StatusDesc"].as_str().unwrap();
    assert_eq!(summary.matches("MissingRequired at").count(), 2, "{summary}");
    assert!(summary.contains("ACORD.InsuranceSvcRq.TransactionRequestDt"));
    assert!(summary.contains("ACORD.InsuranceSvcRq.NewBusiness"));
}

fn with_accept(mut request: Request<Body>, accept: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert("accept", accept.parse().unwrap());
    request
}

#[tokio::test]
async fn test_control_character_value_is_400_in_json() {
    let (app, mut rx) = test_app();
    let body = NEW_BUSINESS.replace("abc-123", r"abc\u0001");
    let response = app
        .oneshot(submit("POST", "/acord/103", "application/json", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["Response"]["ErrorCd"], "ValidationError");
    assert!(json["Response"]["RqUID"].is_null());
    assert_eq!(
        json["Response"]["TransResult"]["ResultInfo"]["ResultInfoCode"]["value"],
        "TypeMismatch"
    );
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_control_character_value_is_400_in_xml() {
    let (app, mut rx) = test_app();
    let body = NEW_BUSINESS.replace("abc-123", r"abc\u0001");
    let request = with_accept(
        submit("POST", "/acord/103", "application/json", &body),
        "application/xml",
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()["content-type"], "application/xml");
    let xml = body_string(response).await;
    assert!(xml.contains("<ErrorCd>ValidationError</ErrorCd>"), "{xml}");
    assert!(xml.contains("TypeMismatch at ACORD.InsuranceSvcRq.RqUID"), "{xml}");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_control_character_root_is_400_in_xml() {
    let (app, mut rx) = test_app();
    let request = with_accept(
        submit("POST", "/acord/103", "application/json", r#"{"A\u0001":{}}"#),
        "application/xml",
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let xml = body_string(response).await;
    assert!(xml.contains("<ErrorCd>ValidationError</ErrorCd>"), "{xml}");
    assert!(xml.contains("<StatusCd>400</StatusCd>"), "{xml}");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_missing_service_request_is_reported_once() {
    let (app, _rx) = test_app();
    let response = app
        .oneshot(submit("POST", "/acord/103", "application/json", r#"{"ACORD":{}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    let summary = json["Response"]["StatusDesc"].as_str().unwrap();
    assert_eq!(summary.matches(" at ").count(), 1, "{summary}");
    assert!(summary.contains("MissingRequired at ACORD.InsuranceSvcRq"));
}

#[tokio::test]
async fn test_malformed_xml_is_rejected_before_validation() {
    let (app, _rx) = test_app();
    let response = app
        .oneshot(submit("PUT", "/acord/1125", "application/xml", "<TXLife><Unclosed>"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["Response"]["ErrorCd"], "MalformedInput");
    assert_eq!(json["Response"]["StatusCd"], "400");
    assert!(json["Response"]["TransResult"]["ResultInfo"].is_null());
}

#[tokio::test]
async fn test_unsupported_content_type_is_malformed_input() {
    let (app, _rx) = test_app();
    let response = app
        .oneshot(submit("POST", "/acord/103", "text/plain", NEW_BUSINESS))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["Response"]["ErrorCd"], "MalformedInput");
}

#[tokio::test]
async fn test_unknown_kind_is_404() {
    let (app, _rx) = test_app();
    let response = app
        .oneshot(submit("POST", "/acord/999", "application/json", NEW_BUSINESS))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["Response"]["StatusCd"], "404");
    assert_eq!(json["Response"]["ErrorCd"], "UnknownTransactionKind");
    assert!(json["Response"]["RqUID"].is_null());
}

#[tokio::test]
async fn test_wrong_method_is_405_with_allow_header() {
    let (app, _rx) = test_app();
    let response = app
        .oneshot(submit("POST", "/acord/1125", "application/xml", POLICY_CHANGE_XML))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "PUT");
    assert_eq!(body_json(response).await["Response"]["ErrorCd"], "MethodNotAllowed");
}

#[tokio::test]
async fn test_full_delivery_queue_is_generic_500() {
    let (state, _rx) = test_state(AppConfig::default(), 1);
    let app = acord_api::app(state);

    let first = app
        .clone()
        .oneshot(submit("POST", "/acord/103", "application/json", NEW_BUSINESS))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .oneshot(submit("POST", "/acord/103", "application/json", NEW_BUSINESS))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(second).await;
    assert_eq!(json["Response"]["ErrorCd"], "InternalError");
    assert_eq!(json["Response"]["StatusDesc"], "An internal error occurred");
    assert_eq!(json["Response"]["RqUID"], "abc-123");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let config = AppConfig {
        max_body_bytes: 32,
        ..AppConfig::default()
    };
    let (state, _rx) = test_state(config, 4);
    let response = acord_api::app(state)
        .oneshot(submit("POST", "/acord/103", "application/json", NEW_BUSINESS))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

// -- Idempotence --------------------------------------------------------------

#[tokio::test]
async fn test_identical_requests_get_identical_responses() {
    let (app, _rx) = test_app();
    let mut bodies = Vec::new();
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(submit("POST", "/acord/103", "application/json", NEW_BUSINESS))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        bodies.push(body_string(response).await);
    }
    assert_eq!(bodies[0], bodies[1]);
}

// -- OpenAPI, CORS, Fallback --------------------------------------------------

#[tokio::test]
async fn test_openapi_spec_lists_registered_forms() {
    let (app, _rx) = test_app();
    for uri in ["/openapi.json", "/"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let spec = body_json(response).await;
        assert!(spec["openapi"].as_str().unwrap().starts_with("3."));
        assert!(spec["paths"]["/acord/103"]["post"].is_object());
        assert!(spec["paths"]["/acord/1125"]["put"].is_object());
    }
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let (app, _rx) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/acord/103")
                .header("origin", "https://agent.example.com")
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "content-type,x-api-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (app, _rx) = test_app();
    let response = app
        .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_metrics_route_absent_without_recorder() {
    let (app, _rx) = test_app();
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
