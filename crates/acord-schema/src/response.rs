//! # Response Schemas
//!
//! Every form answers with a `Response` document. The success shape echoes
//! the form's correlation field under the same name the request used
//! (`RqUID`, `TransRefGUID`, ...) and stamps the execution date and time.
//! The error shape carries the outcome name in `ErrorCd` and, when the
//! failure is a validation issue, the first issue as a structured
//! `TransResult.ResultInfo`.

use acord_core::TypeCode;

use crate::node::SchemaNode;

/// Root element name of every response document.
pub const RESPONSE_ROOT: &str = "Response";

/// Response field names a correlation field may not reuse.
pub const RESERVED_FIELDS: [&str; 6] = [
    "StatusCd",
    "StatusDesc",
    "ErrorCd",
    "TransResult",
    "TransExeDate",
    "TransExeTime",
];

/// `ResultCode` of an accepted transaction.
pub fn success_result() -> TypeCode {
    TypeCode::new("1", "Success")
}

/// `ResultCode` of a rejected transaction.
pub fn failure_result() -> TypeCode {
    TypeCode::new("5", "Failure")
}

/// Success response for a form whose correlation field is `correlation_field`.
pub fn success_response(correlation_field: &str) -> SchemaNode {
    SchemaNode::object(
        RESPONSE_ROOT,
        [
            SchemaNode::string(correlation_field).required(),
            SchemaNode::string("StatusCd").required(),
            SchemaNode::string("StatusDesc").required(),
            SchemaNode::object("TransResult", [SchemaNode::type_code("ResultCode").required()])
                .required(),
            SchemaNode::date("TransExeDate").required(),
            SchemaNode::time("TransExeTime").required(),
        ],
    )
    .required()
}

/// Error response. `correlation_field` is `None` when no form was resolved.
pub fn error_response(correlation_field: Option<&str>) -> SchemaNode {
    let mut fields = Vec::with_capacity(7);
    if let Some(name) = correlation_field {
        fields.push(SchemaNode::string(name));
    }
    fields.extend([
        SchemaNode::string("StatusCd").required(),
        SchemaNode::string("StatusDesc").required(),
        SchemaNode::string("ErrorCd").required(),
        SchemaNode::object(
            "TransResult",
            [
                SchemaNode::type_code("ResultCode").required(),
                SchemaNode::object(
                    "ResultInfo",
                    [
                        SchemaNode::type_code("ResultInfoCode").required(),
                        SchemaNode::string("ResultInfoDesc").required(),
                    ],
                ),
            ],
        )
        .required(),
        SchemaNode::date("TransExeDate").required(),
        SchemaNode::time("TransExeTime").required(),
    ]);
    SchemaNode::object(RESPONSE_ROOT, fields).required()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_response_echoes_named_correlation_field() {
        let schema = success_response("TransRefGUID");
        assert!(schema.resolve("Response.TransRefGUID").unwrap().is_required());
        assert!(schema.resolve("Response.TransResult.ResultCode").is_some());
        assert!(schema.check().is_ok());
    }

    #[test]
    fn error_response_without_form_has_no_correlation_field() {
        let schema = error_response(None);
        assert!(schema.resolve("Response.RqUID").is_none());
        assert!(schema.resolve("Response.ErrorCd").unwrap().is_required());
        assert!(!schema.resolve("Response.TransResult.ResultInfo").unwrap().is_required());
        assert!(schema.check().is_ok());
    }

    #[test]
    fn error_response_correlation_is_optional() {
        let schema = error_response(Some("RqUID"));
        assert!(!schema.resolve("Response.RqUID").unwrap().is_required());
    }
}
