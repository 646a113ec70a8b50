//! # Schema Registry
//!
//! The immutable, process-wide table from [`TransactionKind`] to
//! [`FormSchema`]. A registry is materialized once (from the built-in form
//! set, or from a YAML/JSON registry file) and then shared read-only behind
//! an `Arc`; there is no mutation API.
//!
//! ## Loading
//!
//! Every form is checked at load time:
//!
//! - field names are valid XML element names, so encoding is total;
//! - sibling names are unique;
//! - the correlation path resolves to a `string` field of the request;
//! - no transaction kind is registered twice.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use acord_core::{CanonicalDocument, Node, TransactionKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::{is_xml_text, SchemaError, SchemaNode, Shape};
use crate::response;
use crate::validate::{validate, IssueKind, ValidationIssue};

const STANDARD_FORMS: &str = include_str!("../schemas/standard-forms.yaml");

/// Error while building or querying the registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No form is registered for the requested kind.
    #[error("no schema registered for transaction kind {0}")]
    UnknownTransactionKind(TransactionKind),

    /// Two forms claim the same transaction kind.
    #[error("transaction kind {0} is registered more than once")]
    DuplicateKind(TransactionKind),

    /// A form's field tree is structurally invalid.
    #[error("invalid schema for {kind}: {source}")]
    InvalidSchema {
        /// The form being loaded.
        kind: TransactionKind,
        /// Underlying problem.
        #[source]
        source: SchemaError,
    },

    /// The correlation path does not point at a string field of the request.
    #[error("invalid correlation path '{path}' for {kind}: {reason}")]
    InvalidCorrelation {
        /// The form being loaded.
        kind: TransactionKind,
        /// Declared path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The registry source could not be parsed.
    #[error("registry source parse error: {0}")]
    Parse(String),

    /// IO error reading the registry source.
    #[error("io error reading '{path}': {source}")]
    Io {
        /// File being read.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// HTTP method a form's endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// `POST`
    #[default]
    Post,
    /// `PUT`
    Put,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an accepted request means, and so which success status it earns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// A submission accepted for processing ("201").
    Submission,
    /// A status inquiry answered ("200").
    Inquiry,
}

impl Disposition {
    /// Success status code for this disposition.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Submission => 201,
            Self::Inquiry => 200,
        }
    }
}

/// Serialized form of a registry entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormSpec {
    /// Transaction kind served.
    pub kind: TransactionKind,
    /// Short title, used as the OpenAPI operation summary.
    pub title: String,
    /// Endpoint method.
    #[serde(default)]
    pub method: Method,
    /// Submission or inquiry.
    pub disposition: Disposition,
    /// Fixed human-readable success description.
    pub description: String,
    /// Dotted path of the correlation identifier, root included.
    pub correlation: String,
    /// Request field tree.
    pub request: SchemaNode,
}

/// A loaded, checked registry entry.
#[derive(Debug, Clone)]
pub struct FormSchema {
    spec: FormSpec,
    response: SchemaNode,
    error_response: SchemaNode,
}

impl FormSchema {
    /// Check a form definition and derive its response schemas.
    pub fn new(spec: FormSpec) -> Result<Self, RegistryError> {
        spec.request
            .check()
            .map_err(|source| RegistryError::InvalidSchema {
                kind: spec.kind,
                source,
            })?;

        let invalid = |reason: &str| RegistryError::InvalidCorrelation {
            kind: spec.kind,
            path: spec.correlation.clone(),
            reason: reason.to_string(),
        };
        let target = spec
            .request
            .resolve(&spec.correlation)
            .ok_or_else(|| invalid("path does not resolve within the request schema"))?;
        if target.shape() != &Shape::String {
            return Err(invalid("correlation field must have type string"));
        }
        if response::RESERVED_FIELDS.contains(&target.name()) {
            return Err(invalid("name collides with a response status field"));
        }

        let field = target.name().to_string();
        Ok(Self {
            response: response::success_response(&field),
            error_response: response::error_response(Some(&field)),
            spec,
        })
    }

    /// Transaction kind served.
    pub fn kind(&self) -> TransactionKind {
        self.spec.kind
    }

    /// Short title.
    pub fn title(&self) -> &str {
        &self.spec.title
    }

    /// Endpoint method.
    pub fn method(&self) -> Method {
        self.spec.method
    }

    /// Submission or inquiry.
    pub fn disposition(&self) -> Disposition {
        self.spec.disposition
    }

    /// Fixed success description.
    pub fn description(&self) -> &str {
        &self.spec.description
    }

    /// Dotted correlation path, root included.
    pub fn correlation_path(&self) -> &str {
        &self.spec.correlation
    }

    /// Name of the correlation field (last path segment).
    pub fn correlation_field(&self) -> &str {
        self.spec
            .correlation
            .rsplit('.')
            .next()
            .unwrap_or(&self.spec.correlation)
    }

    /// Request body schema.
    pub fn request(&self) -> &SchemaNode {
        &self.spec.request
    }

    /// Success response schema.
    pub fn response(&self) -> &SchemaNode {
        &self.response
    }

    /// Error response schema.
    pub fn error_response(&self) -> &SchemaNode {
        &self.error_response
    }

    /// The definition this form was loaded from.
    pub fn spec(&self) -> &FormSpec {
        &self.spec
    }

    /// The correlation identifier carried by `doc`, if present, not blank
    /// and writable as XML.
    pub fn correlation_id<'d>(&self, doc: &'d CanonicalDocument) -> Option<&'d str> {
        doc.find(&self.spec.correlation)
            .and_then(Node::as_text)
            .filter(|id| !id.trim().is_empty() && is_xml_text(id))
    }

    /// Validate a request document: schema issues first, then a
    /// `MissingRequired` issue if the correlation id is blank and nothing
    /// at or above its path was already reported.
    pub fn check_request(&self, doc: &CanonicalDocument) -> Vec<ValidationIssue> {
        let mut issues = validate(doc, &self.spec.request);
        let correlation = self.spec.correlation.as_str();
        let covered = issues.iter().any(|i| is_at_or_above(&i.path, correlation));
        if self.correlation_id(doc).is_none() && !covered {
            issues.push(ValidationIssue::new(
                correlation,
                IssueKind::MissingRequired,
                "correlation identifier is empty",
            ));
        }
        issues
    }
}

/// Whether `path` is `target` or one of its ancestors.
fn is_at_or_above(path: &str, target: &str) -> bool {
    target
        .strip_prefix(path)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistrySpec {
    forms: Vec<FormSpec>,
}

/// Read-only map from transaction kind to form schema.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    forms: BTreeMap<TransactionKind, FormSchema>,
    error_response: SchemaNode,
}

impl SchemaRegistry {
    /// Build a registry from checked forms.
    pub fn new(forms: impl IntoIterator<Item = FormSchema>) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        for form in forms {
            let kind = form.kind();
            if map.insert(kind, form).is_some() {
                return Err(RegistryError::DuplicateKind(kind));
            }
        }
        Ok(Self {
            forms: map,
            error_response: response::error_response(None),
        })
    }

    /// The built-in ACORD forms: 103, 1125, 203 and 302.
    pub fn standard() -> Result<Self, RegistryError> {
        Self::from_yaml_str(STANDARD_FORMS)
    }

    /// Load a registry document (`forms: [...]`). JSON is accepted too.
    pub fn from_yaml_str(source: &str) -> Result<Self, RegistryError> {
        let spec: RegistrySpec =
            serde_yaml::from_str(source).map_err(|e| RegistryError::Parse(e.to_string()))?;
        let forms = spec
            .forms
            .into_iter()
            .map(FormSchema::new)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(forms)
    }

    /// Load a registry document from a file.
    pub fn from_path(path: &Path) -> Result<Self, RegistryError> {
        let source = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&source)
    }

    /// Find the form registered for `kind`.
    pub fn lookup(&self, kind: TransactionKind) -> Result<&FormSchema, RegistryError> {
        self.forms
            .get(&kind)
            .ok_or(RegistryError::UnknownTransactionKind(kind))
    }

    /// All forms, ordered by transaction code.
    pub fn forms(&self) -> impl Iterator<Item = &FormSchema> {
        self.forms.values()
    }

    /// Number of registered forms.
    pub fn len(&self) -> usize {
        self.forms.len()
    }

    /// Whether no forms are registered.
    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    /// Error response schema used when no form could be resolved.
    pub fn error_response(&self) -> &SchemaNode {
        &self.error_response
    }
}
