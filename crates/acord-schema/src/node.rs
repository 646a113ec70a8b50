//! # Schema Nodes
//!
//! A [`SchemaNode`] describes one named field of an ACORD form: its
//! [`Shape`] (string, date, time, type-code, or object with nested fields)
//! and whether it must be present. A single tree of these drives both the
//! validator and the codec's shape hints, so there is no per-form logic
//! anywhere in the workspace.
//!
//! ## Serialized Form
//!
//! Registry files describe fields as
//!
//! ```yaml
//! name: ContractTerm
//! type: object
//! required: false
//! fields:
//!   - { name: EffectiveDt, type: date }
//!   - { name: ExpirationDt, type: date }
//! ```
//!
//! `type` is one of `string`, `date`, `time`, `type-code`, `object`.
//! Only `object` fields may carry `fields`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural problem in a schema definition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A field name cannot be used as an XML element name.
    #[error("invalid field name {name:?} at '{path}': names must start with a letter or '_' and contain only letters, digits, '_' or '-'")]
    InvalidName {
        /// Dotted path of the parent.
        path: String,
        /// The offending name.
        name: String,
    },

    /// Two fields under the same object share a name.
    #[error("duplicate field '{name}' under '{path}'")]
    DuplicateField {
        /// Dotted path of the parent object.
        path: String,
        /// The repeated name.
        name: String,
    },

    /// A non-object field declares nested fields.
    #[error("field '{path}' has type {shape} and cannot declare nested fields")]
    LeafWithFields {
        /// Dotted path of the field.
        path: String,
        /// Declared shape.
        shape: &'static str,
    },
}

/// Expected content of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// Free text.
    String,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// Time of day, `HH:MM:SS`.
    Time,
    /// ACORD type-code: `tc` qualifier plus display value.
    TypeCode,
    /// Nested fields.
    Object(Vec<SchemaNode>),
}

impl Shape {
    /// Name used in registry files and diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Date => "date",
            Self::Time => "time",
            Self::TypeCode => "type-code",
            Self::Object(_) => "object",
        }
    }
}

/// One named field of a form schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FieldSpec", into = "FieldSpec")]
pub struct SchemaNode {
    name: String,
    required: bool,
    shape: Shape,
}

impl SchemaNode {
    fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            required: false,
            shape,
        }
    }

    /// Optional free-text field.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, Shape::String)
    }

    /// Optional date field.
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Date)
    }

    /// Optional time field.
    pub fn time(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Time)
    }

    /// Optional type-code field.
    pub fn type_code(name: impl Into<String>) -> Self {
        Self::new(name, Shape::TypeCode)
    }

    /// Optional object field with the given nested fields.
    pub fn object(name: impl Into<String>, fields: impl IntoIterator<Item = SchemaNode>) -> Self {
        Self::new(name, Shape::Object(fields.into_iter().collect()))
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Field (and element) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the field must be present.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Expected content.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Nested fields. Empty for leaves.
    pub fn fields(&self) -> &[SchemaNode] {
        match &self.shape {
            Shape::Object(fields) => fields,
            _ => &[],
        }
    }

    /// Look up a nested field by name.
    pub fn field(&self, name: &str) -> Option<&SchemaNode> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Resolve a dotted path whose first segment is this node's name.
    pub fn resolve(&self, path: &str) -> Option<&SchemaNode> {
        let mut segments = path.split('.');
        if segments.next()? != self.name {
            return None;
        }
        segments.try_fold(self, |node, segment| node.field(segment))
    }

    /// Check names and sibling uniqueness across the whole tree.
    pub fn check(&self) -> Result<(), SchemaError> {
        self.check_at("")
    }

    fn check_at(&self, parent: &str) -> Result<(), SchemaError> {
        if !is_element_name(&self.name) {
            return Err(SchemaError::InvalidName {
                path: parent.to_string(),
                name: self.name.clone(),
            });
        }
        let path = join_path(parent, &self.name);
        let fields = self.fields();
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    path,
                    name: field.name.clone(),
                });
            }
            field.check_at(&path)?;
        }
        Ok(())
    }
}

/// Join a dotted parent path and a child name.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

/// Whether `name` is usable both as a JSON key and an XML element name,
/// and cannot be confused with a dotted path separator.
pub fn is_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// XML 1.0 `Char` production.
pub fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Whether every character of `text` can be written to an XML document.
pub fn is_xml_text(text: &str) -> bool {
    text.chars().all(is_xml_char)
}

/// Field type tag as written in registry files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum FieldType {
    String,
    Date,
    Time,
    TypeCode,
    Object,
}

/// Serialized form of a [`SchemaNode`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldSpec {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default)]
    required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldSpec>,
}

impl TryFrom<FieldSpec> for SchemaNode {
    type Error = SchemaError;

    fn try_from(spec: FieldSpec) -> Result<Self, Self::Error> {
        let shape = match spec.field_type {
            FieldType::Object => Shape::Object(
                spec.fields
                    .into_iter()
                    .map(SchemaNode::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            leaf => {
                let shape = match leaf {
                    FieldType::String => Shape::String,
                    FieldType::Date => Shape::Date,
                    FieldType::Time => Shape::Time,
                    _ => Shape::TypeCode,
                };
                if !spec.fields.is_empty() {
                    return Err(SchemaError::LeafWithFields {
                        path: spec.name,
                        shape: shape.label(),
                    });
                }
                shape
            }
        };
        Ok(Self {
            name: spec.name,
            required: spec.required,
            shape,
        })
    }
}

impl From<SchemaNode> for FieldSpec {
    fn from(node: SchemaNode) -> Self {
        let (field_type, fields) = match node.shape {
            Shape::String => (FieldType::String, Vec::new()),
            Shape::Date => (FieldType::Date, Vec::new()),
            Shape::Time => (FieldType::Time, Vec::new()),
            Shape::TypeCode => (FieldType::TypeCode, Vec::new()),
            Shape::Object(children) => (
                FieldType::Object,
                children.into_iter().map(FieldSpec::from).collect(),
            ),
        };
        Self {
            name: node.name,
            field_type,
            required: node.required,
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract_term() -> SchemaNode {
        SchemaNode::object(
            "ContractTerm",
            [SchemaNode::date("EffectiveDt").required(), SchemaNode::date("ExpirationDt")],
        )
    }

    #[test]
    fn resolve_walks_nested_fields() {
        let term = contract_term();
        let eff = term.resolve("ContractTerm.EffectiveDt").unwrap();
        assert_eq!(eff.shape(), &Shape::Date);
        assert!(eff.is_required());
        assert!(term.resolve("ContractTerm.Missing").is_none());
        assert!(term.resolve("Other.EffectiveDt").is_none());
    }

    #[test]
    fn check_rejects_duplicate_fields() {
        let node = SchemaNode::object(
            "Policy",
            [SchemaNode::string("PolNumber"), SchemaNode::string("PolNumber")],
        );
        assert_eq!(
            node.check().unwrap_err(),
            SchemaError::DuplicateField {
                path: "Policy".into(),
                name: "PolNumber".into(),
            }
        );
    }

    #[test]
    fn check_rejects_unencodable_names() {
        for bad in ["", "1st", "Has Space", "a.b", "x:y"] {
            let node = SchemaNode::object("Root", [SchemaNode::string(bad)]);
            assert!(
                matches!(node.check(), Err(SchemaError::InvalidName { .. })),
                "accepted {bad:?}"
            );
        }
        assert!(contract_term().check().is_ok());
    }

    #[test]
    fn yaml_field_spec_parses() {
        let yaml = r#"
name: ContractTerm
type: object
required: true
fields:
  - { name: EffectiveDt, type: date, required: true }
  - { name: ResultCode, type: type-code }
"#;
        let node: SchemaNode = serde_yaml::from_str(yaml).unwrap();
        assert!(node.is_required());
        assert_eq!(node.fields().len(), 2);
        assert_eq!(node.field("ResultCode").unwrap().shape(), &Shape::TypeCode);
    }

    #[test]
    fn yaml_leaf_with_fields_rejected() {
        let yaml = r#"
name: LOBCd
type: string
fields:
  - { name: Nested, type: string }
"#;
        let err = serde_yaml::from_str::<SchemaNode>(yaml).unwrap_err();
        assert!(err.to_string().contains("cannot declare nested fields"), "{err}");
    }

    #[test]
    fn yaml_unknown_type_rejected() {
        let yaml = "name: Amount\ntype: decimal\n";
        assert!(serde_yaml::from_str::<SchemaNode>(yaml).is_err());
    }

    #[test]
    fn serialized_form_round_trips() {
        let node = contract_term().required();
        let yaml = serde_yaml::to_string(&node).unwrap();
        let back: SchemaNode = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, node);
    }
}
