//! # JSON Schema Export
//!
//! Renders a [`SchemaNode`] tree as a JSON Schema (draft 2020-12) describing
//! the JSON wire form of the same document: type-codes become
//! `{"tc": ..., "value": ...}` objects, dates and times become patterned
//! strings, and objects stay open to unknown members.

use serde_json::{json, Map, Value};

use crate::node::{SchemaNode, Shape};

/// Dialect URI written into exported schemas.
pub const DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

/// Shape check for `YYYY-MM-DD` values.
pub const DATE_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}$";
/// Shape check for `HH:MM:SS` values.
pub const TIME_PATTERN: &str = r"^([01]\d|2[0-3]):[0-5]\d:[0-5]\d$";

/// JSON Schema for a whole document rooted at `root`.
///
/// The top level is closed: exactly the root member is allowed.
pub fn to_json_schema(root: &SchemaNode) -> Value {
    let mut properties = Map::new();
    properties.insert(root.name().to_string(), field_schema(root));
    json!({
        "$schema": DIALECT,
        "type": "object",
        "properties": properties,
        "required": [root.name()],
        "additionalProperties": false,
    })
}

fn field_schema(node: &SchemaNode) -> Value {
    match node.shape() {
        Shape::String => json!({ "type": "string" }),
        Shape::Date => json!({ "type": "string", "format": "date", "pattern": DATE_PATTERN }),
        Shape::Time => json!({ "type": "string", "pattern": TIME_PATTERN }),
        Shape::TypeCode => json!({
            "type": "object",
            "properties": {
                "tc": { "type": "string" },
                "value": { "type": "string" },
            },
            "required": ["tc", "value"],
        }),
        Shape::Object(fields) => {
            let properties: Map<String, Value> = fields
                .iter()
                .map(|f| (f.name().to_string(), field_schema(f)))
                .collect();
            let required: Vec<&str> = fields
                .iter()
                .filter(|f| f.is_required())
                .map(SchemaNode::name)
                .collect();
            let mut schema = json!({ "type": "object", "properties": properties });
            if !required.is_empty() {
                schema["required"] = json!(required);
            }
            schema
        }
    }
}
