//! # Error Types
//!
//! Errors raised while constructing core values. All errors use `thiserror`
//! for derive-based `Display` and `Error` implementations; higher crates wrap
//! them in their own enums rather than flattening them into strings.

use thiserror::Error;

/// Error while assembling a [`CanonicalDocument`](crate::CanonicalDocument) tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// Two siblings share a name. ACORD transactions handled here never use
    /// repeating groups, so the second occurrence is rejected.
    #[error("duplicate element '{name}' under '{parent}': repeating groups are not supported")]
    DuplicateChild {
        /// Name of the group receiving the child.
        parent: String,
        /// The repeated child name.
        name: String,
    },

    /// A child was pushed onto a text or type-code node.
    #[error("element '{0}' carries a value and cannot hold child elements")]
    NotAGroup(String),
}

/// Error while parsing a [`TransactionKind`](crate::TransactionKind).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KindError {
    /// The input is not an ACORD transaction code.
    #[error("unrecognized transaction kind {0:?}: expected a code such as 103 or ACORD1125")]
    Unrecognized(String),
}

/// Error while resolving a [`WireFormat`](crate::WireFormat).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The declared content type is neither JSON nor XML.
    #[error("unsupported content type {0:?}: expected application/json or application/xml")]
    UnsupportedContentType(String),

    /// A format name (CLI flag, file extension) is not recognised.
    #[error("unknown wire format {0:?}: expected json or xml")]
    UnknownFormat(String),
}
