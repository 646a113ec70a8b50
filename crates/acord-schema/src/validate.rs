//! # Structural Validation
//!
//! Walks a [`CanonicalDocument`] against a [`SchemaNode`] tree and collects
//! every structural problem in one pass. Validation never stops at the first
//! issue, so a caller can fix a rejected request in one round trip.
//!
//! ## Rules
//!
//! - A required field that is absent yields `MissingRequired`. If its parent
//!   is itself absent, only the parent is reported.
//! - Date and time fields must be text in `YYYY-MM-DD` / `HH:MM:SS` form;
//!   anything else that is text yields `MalformedDate` / `MalformedTime`.
//! - Any other mismatch between node content and declared shape yields
//!   `TypeMismatch`, as does text holding characters outside the XML 1.0
//!   character set, since such a value could not be written as XML.
//! - Fields the schema does not declare are ignored.

use std::fmt;

use acord_core::temporal::{parse_date, parse_time};
use acord_core::{CanonicalDocument, Node, NodeValue};
use serde::Serialize;

use crate::node::{is_xml_text, join_path, SchemaNode, Shape};

/// Category of a [`ValidationIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IssueKind {
    /// A required field is absent.
    MissingRequired,
    /// Content does not match the declared shape.
    TypeMismatch,
    /// A date field is not a valid `YYYY-MM-DD` calendar date.
    MalformedDate,
    /// A time field is not a valid `HH:MM:SS` time of day.
    MalformedTime,
}

impl IssueKind {
    /// Stable name, used in logs and response bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRequired => "MissingRequired",
            Self::TypeMismatch => "TypeMismatch",
            Self::MalformedDate => "MalformedDate",
            Self::MalformedTime => "MalformedTime",
        }
    }

    /// ACORD `ResultInfoCode` type-code qualifier for this issue.
    pub fn result_info_code(&self) -> &'static str {
        match self {
            Self::MissingRequired => "1",
            Self::TypeMismatch => "2",
            Self::MalformedDate => "3",
            Self::MalformedTime => "4",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structural problem found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Dot-separated path from the root, root name included.
    pub path: String,
    /// Issue category.
    pub kind: IssueKind,
    /// Human-readable explanation.
    pub detail: String,
}

impl ValidationIssue {
    /// Create an issue.
    pub fn new(path: impl Into<String>, kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            detail: detail.into(),
        }
    }

    /// A `MissingRequired` issue at `path`.
    pub fn missing(path: impl Into<String>) -> Self {
        Self::new(path, IssueKind::MissingRequired, "required field is absent")
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.kind, self.path, self.detail)
    }
}

/// Validate `doc` against `schema`. An empty result means the document is valid.
pub fn validate(doc: &CanonicalDocument, schema: &SchemaNode) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let root = doc.root();
    if root.name() != schema.name() {
        issues.push(ValidationIssue::new(
            schema.name(),
            IssueKind::MissingRequired,
            format!(
                "expected root element {:?}, found {:?}",
                schema.name(),
                root.name()
            ),
        ));
        return issues;
    }
    check_node(root, schema, schema.name(), &mut issues);
    issues
}

/// One-line summary of all issues, in document order.
pub fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn check_node(node: &Node, schema: &SchemaNode, path: &str, issues: &mut Vec<ValidationIssue>) {
    let value = node.value();
    match (schema.shape(), value) {
        (Shape::String, NodeValue::Text(text)) => {
            if !is_xml_text(text) {
                issues.push(not_xml(path));
            }
        }
        (Shape::TypeCode, NodeValue::Code(code)) => {
            if !is_xml_text(&code.tc) || !is_xml_text(&code.value) {
                issues.push(not_xml(path));
            }
        }
        (Shape::Date, NodeValue::Text(text)) => {
            if parse_date(text).is_none() {
                issues.push(ValidationIssue::new(
                    path,
                    IssueKind::MalformedDate,
                    format!("{text:?} is not a YYYY-MM-DD calendar date"),
                ));
            }
        }
        (Shape::Time, NodeValue::Text(text)) => {
            if parse_time(text).is_none() {
                issues.push(ValidationIssue::new(
                    path,
                    IssueKind::MalformedTime,
                    format!("{text:?} is not an HH:MM:SS time of day"),
                ));
            }
        }
        (Shape::Object(fields), NodeValue::Group(_)) => {
            for field in fields {
                let child_path = join_path(path, field.name());
                match node.child(field.name()) {
                    Some(child) => check_node(child, field, &child_path, issues),
                    None if field.is_required() => {
                        issues.push(ValidationIssue::missing(child_path));
                    }
                    None => {}
                }
            }
        }
        (expected, found) => issues.push(ValidationIssue::new(
            path,
            IssueKind::TypeMismatch,
            format!("expected {}, found {}", expected.label(), found.label()),
        )),
    }
}

fn not_xml(path: &str) -> ValidationIssue {
    ValidationIssue::new(
        path,
        IssueKind::TypeMismatch,
        "value contains characters not allowed in XML 1.0",
    )
}
