//! # JSON Representation
//!
//! A document is a JSON object with exactly one member: the root element.
//! Groups are objects, text is a string, and a type-code is an object with
//! the members `tc` and `value`. The alternate spelling `{"@tc", "#text"}`
//! produced by common XML-to-JSON converters is accepted on input.
//!
//! Numbers and booleans are accepted as leaf values and kept as their text
//! form. `null` members are treated as absent. Arrays are rejected: ACORD
//! repeating groups are not supported. Duplicate keys are rejected rather
//! than silently keeping the last one.

use std::fmt;

use acord_core::{CanonicalDocument, Node, NodeValue, TypeCode, WireFormat};
use acord_schema::{SchemaNode, Shape};
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::{root_hint, CodecError};

/// Accepted `(code, value)` member pairs for a type-code. The first is
/// the one written on output.
const TYPE_CODE_KEYS: [(&str, &str); 2] = [("tc", "value"), ("@tc", "#text")];

fn malformed(reason: impl Into<String>) -> CodecError {
    CodecError::malformed(WireFormat::Json, reason)
}

/// Parsed JSON, reduced to what the canonical model can hold. Members stay
/// in document order.
#[derive(Debug)]
enum RawJson {
    Text(String),
    Null,
    Object(Vec<(String, RawJson)>),
}

impl<'de> Deserialize<'de> for RawJson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawVisitor)
    }
}

struct RawVisitor;

impl<'de> Visitor<'de> for RawVisitor {
    type Value = RawJson;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object, string, number, boolean or null")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<RawJson, E> {
        Ok(RawJson::Text(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<RawJson, E> {
        Ok(RawJson::Text(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<RawJson, E> {
        Ok(RawJson::Text(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<RawJson, E> {
        Ok(RawJson::Text(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RawJson, E> {
        Ok(RawJson::Text(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<RawJson, E> {
        Ok(RawJson::Text(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<RawJson, E> {
        Ok(RawJson::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<RawJson, E> {
        Ok(RawJson::Null)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, _seq: A) -> Result<RawJson, A::Error> {
        Err(de::Error::custom(
            "arrays are not supported (repeating groups are not accepted)",
        ))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawJson, A::Error> {
        let mut members: Vec<(String, RawJson)> = Vec::new();
        while let Some(key) = map.next_key::<String>()? {
            if members.iter().any(|(k, _)| *k == key) {
                return Err(de::Error::custom(format!("duplicate key {key:?}")));
            }
            let value = map.next_value::<RawJson>()?;
            members.push((key, value));
        }
        Ok(RawJson::Object(members))
    }
}

/// Decode a JSON document.
pub fn decode(bytes: &[u8], schema: Option<&SchemaNode>) -> Result<CanonicalDocument, CodecError> {
    let raw: RawJson = serde_json::from_slice(bytes).map_err(|e| malformed(e.to_string()))?;
    let RawJson::Object(members) = raw else {
        return Err(malformed("top level must be an object"));
    };
    let mut members = members.into_iter();
    let (Some((name, value)), None) = (members.next(), members.next()) else {
        return Err(malformed("top level must have exactly one member, the root element"));
    };

    let hint = root_hint(schema, &name);
    into_node(name, value, hint)?
        .map(CanonicalDocument::new)
        .ok_or_else(|| malformed("root element is null"))
}

fn into_node(
    name: String,
    raw: RawJson,
    hint: Option<&SchemaNode>,
) -> Result<Option<Node>, CodecError> {
    match raw {
        RawJson::Null => Ok(None),
        RawJson::Text(text) => Ok(Some(Node::text(name, text))),
        RawJson::Object(members) => {
            let code_expected = hint.map_or(true, |h| h.shape() == &Shape::TypeCode);
            if code_expected {
                if let Some(code) = as_type_code(&members) {
                    return Ok(Some(Node::code(name, code)));
                }
            }

            let mut group = Node::group(name);
            for (key, value) in members {
                let child_hint = hint.and_then(|h| h.field(&key));
                if let Some(child) = into_node(key, value, child_hint)? {
                    group.push(child).map_err(|e| malformed(e.to_string()))?;
                }
            }
            Ok(Some(group))
        }
    }
}

fn as_type_code(members: &[(String, RawJson)]) -> Option<TypeCode> {
    let [(k1, RawJson::Text(v1)), (k2, RawJson::Text(v2))] = members else {
        return None;
    };
    TYPE_CODE_KEYS.iter().find_map(|&(code_key, value_key)| {
        if k1 == code_key && k2 == value_key {
            Some(TypeCode::new(v1.clone(), v2.clone()))
        } else if k2 == code_key && k1 == value_key {
            Some(TypeCode::new(v2.clone(), v1.clone()))
        } else {
            None
        }
    })
}

/// A document as a single-member JSON object.
struct JsonDocument<'a>(&'a Node);

impl Serialize for JsonDocument<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0.name(), &JsonValue(self.0))?;
        map.end()
    }
}

/// The value side of a node's member.
struct JsonValue<'a>(&'a Node);

impl Serialize for JsonValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.value() {
            NodeValue::Text(text) => serializer.serialize_str(text),
            NodeValue::Code(code) => {
                let (code_key, value_key) = TYPE_CODE_KEYS[0];
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry(code_key, &code.tc)?;
                map.serialize_entry(value_key, &code.value)?;
                map.end()
            }
            NodeValue::Group(children) => {
                let mut map = serializer.serialize_map(Some(children.len()))?;
                for child in children {
                    map.serialize_entry(child.name(), &JsonValue(child))?;
                }
                map.end()
            }
        }
    }
}

/// Encode a document as compact JSON, members in document order.
pub fn encode(doc: &CanonicalDocument) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(&JsonDocument(doc.root())).map_err(encode_error)
}

/// Encode a document as indented JSON.
pub fn encode_pretty(doc: &CanonicalDocument) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec_pretty(&JsonDocument(doc.root())).map_err(encode_error)
}

fn encode_error(e: serde_json::Error) -> CodecError {
    CodecError::Encode {
        format: WireFormat::Json,
        reason: e.to_string(),
    }
}
