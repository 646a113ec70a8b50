//! # OpenAPI Specification Assembly
//!
//! The static part of the document (info, health probes, error body) comes
//! from the `ApiDoc` derive. One operation per registered form is added at
//! startup from the registry, with request and response bodies generated
//! from the form's schemas by way of the JSON Schema export, so the
//! published contract always matches what the validator enforces. Served at
//! `/openapi.json` and `/`.

use acord_core::WireFormat;
use acord_schema::{to_json_schema, FormSchema, Method, SchemaNode, SchemaRegistry};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::content::ContentBuilder;
use utoipa::openapi::path::{HttpMethod, OperationBuilder, PathItem};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::response::{Response, ResponseBuilder};
use utoipa::openapi::schema::{Object, Schema};
use utoipa::openapi::{Required, RefOr};
use utoipa::OpenApi;

use crate::state::AppState;

/// Static portion of the OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ACORD Transaction Gateway",
        version = "0.1.0",
        description = "Accepts ACORD insurance transactions as JSON or XML, validates them against registered form schemas, and answers with an ACORD Response envelope in the negotiated representation.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(crate::liveness, crate::readiness),
    components(schemas(crate::error::ErrorBody, crate::error::ErrorDetail)),
    tags(
        (name = "acord", description = "ACORD transaction submission and inquiry"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

/// Full document: the static part plus one operation per registered form.
pub fn document(registry: &SchemaRegistry) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    for form in registry.forms() {
        let method = match form.method() {
            Method::Post => HttpMethod::Post,
            Method::Put => HttpMethod::Put,
        };
        doc.paths.paths.insert(
            format!("/acord/{}", form.kind().path_segment()),
            PathItem::new(method, operation(form, registry)),
        );
    }
    doc
}

fn operation(form: &FormSchema, registry: &SchemaRegistry) -> utoipa::openapi::path::Operation {
    let success = form.disposition().status_code().to_string();
    let errors = document_schema(form.error_response());

    OperationBuilder::new()
        .tag("acord")
        .operation_id(Some(format!("submit_{}", form.kind().code())))
        .summary(Some(format!("{} ({})", form.title(), form.kind())))
        .description(Some(format!(
            "Correlated by `{}`. Responds `{success}` with \"{}\" on success.",
            form.correlation_path(),
            form.description()
        )))
        .request_body(Some(
            RequestBodyBuilder::new()
                .description(Some(format!("{} request document", form.kind())))
                .content(
                    WireFormat::Json.media_type(),
                    ContentBuilder::new()
                        .schema(Some(document_schema(form.request())))
                        .build(),
                )
                .content(
                    WireFormat::Xml.media_type(),
                    ContentBuilder::new()
                        .schema(Some(document_schema(form.request())))
                        .build(),
                )
                .required(Some(Required::True))
                .build(),
        ))
        .response(
            success,
            envelope_response("Accepted", document_schema(form.response())),
        )
        .response("400", envelope_response("Malformed or invalid document", errors.clone()))
        .response("405", envelope_response("Wrong method for this form", errors.clone()))
        .response(
            "404",
            envelope_response(
                "Unknown transaction kind",
                document_schema(registry.error_response()),
            ),
        )
        .response("500", envelope_response("Internal error", errors))
        .build()
}

fn envelope_response(description: &str, schema: RefOr<Schema>) -> Response {
    ResponseBuilder::new()
        .description(description)
        .content(
            WireFormat::Json.media_type(),
            ContentBuilder::new().schema(Some(schema.clone())).build(),
        )
        .content(
            WireFormat::Xml.media_type(),
            ContentBuilder::new().schema(Some(schema)).build(),
        )
        .build()
}

/// A whole document: one member, the root element.
fn document_schema(root: &SchemaNode) -> RefOr<Schema> {
    serde_json::from_value(to_json_schema(root)).unwrap_or_else(|e| {
        tracing::error!(
            root = root.name(),
            error = %e,
            "schema export is not a valid OpenAPI schema"
        );
        RefOr::T(Schema::Object(Object::new()))
    })
}

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/openapi.json", get(openapi_json))
        .route("/", get(openapi_json))
}

/// GET /openapi.json: return the generated OpenAPI specification.
async fn openapi_json(State(state): State<AppState>) -> Json<utoipa::openapi::OpenApi> {
    Json(state.openapi.as_ref().clone())
}
