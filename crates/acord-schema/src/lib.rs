//! # acord-schema: Schema Registry and Validation
//!
//! Data-described schemas for ACORD forms and the generic engine that
//! checks documents against them.
//!
//! ## Registry (`registry`)
//!
//! [`SchemaRegistry`] maps each served [`TransactionKind`](acord_core::TransactionKind)
//! to a [`FormSchema`]: request tree, derived response trees, correlation
//! path, endpoint method and success disposition. The built-in forms live in
//! `schemas/standard-forms.yaml`; operators may supply their own file.
//!
//! ## Validation (`validate`)
//!
//! [`validate`] walks a document against a [`SchemaNode`] tree and returns
//! every [`ValidationIssue`] found, in document order.
//!
//! ## JSON Schema export (`json_schema`)
//!
//! [`to_json_schema`] renders a tree as JSON Schema for API consumers.
//!
//! ## Crate Policy
//!
//! - Depends only on `acord-core` internally.
//! - Registries are immutable once built.
//! - Adding a form never modifies an existing entry.

pub mod json_schema;
pub mod node;
pub mod registry;
pub mod response;
pub mod validate;

pub use json_schema::to_json_schema;
pub use node::{SchemaError, SchemaNode, Shape};
pub use registry::{Disposition, FormSchema, FormSpec, Method, RegistryError, SchemaRegistry};
pub use validate::{summarize, validate, IssueKind, ValidationIssue};
