//! # acord-codec: JSON and XML Codecs
//!
//! Converts between wire bytes and the [`CanonicalDocument`] tree.
//!
//! | Canonical node | JSON                              | XML                                |
//! |----------------|-----------------------------------|------------------------------------|
//! | text           | `"Name": "text"`                  | `<Name>text</Name>`                |
//! | type-code      | `"Name": {"tc": "1", "value": "Success"}` | `<Name tc="1">Success</Name>` |
//! | group          | `"Name": { ... }`                 | `<Name>...</Name>`                 |
//!
//! Well-formedness is checked here, before any schema validation. A
//! document that does not parse in its declared format is
//! [`CodecError::Malformed`] regardless of what it contains.
//!
//! ## Shape hints
//!
//! Two representations are ambiguous without a schema: an empty XML element
//! may be empty text or an empty group, and a JSON object with exactly the
//! members `tc` and `value` may be a type-code or a group. [`decode_with`]
//! consults a [`SchemaNode`] to settle those cases. The hint never rejects
//! anything; mismatches are left for the validator to report.

pub mod json;
pub mod xml;

use acord_core::{CanonicalDocument, WireFormat};
use acord_schema::SchemaNode;
use thiserror::Error;

/// Codec failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input is not well-formed in the declared format.
    #[error("malformed {format} input: {reason}")]
    Malformed {
        /// Declared format.
        format: WireFormat,
        /// What was wrong.
        reason: String,
    },

    /// The document contains a name or value the target format cannot carry.
    #[error("cannot represent document as {format}: {reason}")]
    Unrepresentable {
        /// Target format.
        format: WireFormat,
        /// What could not be represented.
        reason: String,
    },

    /// The underlying writer failed.
    #[error("{format} encoding failed: {reason}")]
    Encode {
        /// Target format.
        format: WireFormat,
        /// Writer error.
        reason: String,
    },
}

impl CodecError {
    pub(crate) fn malformed(format: WireFormat, reason: impl Into<String>) -> Self {
        Self::Malformed {
            format,
            reason: reason.into(),
        }
    }

    /// Whether this error describes bad caller input.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Decode `bytes` without a schema.
pub fn decode(bytes: &[u8], format: WireFormat) -> Result<CanonicalDocument, CodecError> {
    decode_hinted(bytes, format, None)
}

/// Decode `bytes`, using `schema` to resolve representational ambiguities.
pub fn decode_with(
    bytes: &[u8],
    format: WireFormat,
    schema: &SchemaNode,
) -> Result<CanonicalDocument, CodecError> {
    decode_hinted(bytes, format, Some(schema))
}

fn decode_hinted(
    bytes: &[u8],
    format: WireFormat,
    schema: Option<&SchemaNode>,
) -> Result<CanonicalDocument, CodecError> {
    match format {
        WireFormat::Json => json::decode(bytes, schema),
        WireFormat::Xml => xml::decode(bytes, schema),
    }
}

/// Encode a document.
pub fn encode(doc: &CanonicalDocument, format: WireFormat) -> Result<Vec<u8>, CodecError> {
    match format {
        WireFormat::Json => json::encode(doc),
        WireFormat::Xml => xml::encode(doc),
    }
}

/// Root-level shape hint: `schema` applies only if its name matches `root`.
pub(crate) fn root_hint<'s>(schema: Option<&'s SchemaNode>, root: &str) -> Option<&'s SchemaNode> {
    schema.filter(|s| s.name() == root)
}
