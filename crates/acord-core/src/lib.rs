//! # acord-core: Foundational Types for the ACORD Gateway
//!
//! This crate is the leaf of the workspace dependency graph. It defines the
//! format-neutral types every other crate speaks:
//!
//! 1. **`CanonicalDocument`.** One ordered tree of named nodes, shared by the
//!    JSON and XML codecs, the validator, and the envelope builder. A node is
//!    text, a type-code (`tc` qualifier plus human-readable value), or a
//!    group of uniquely named children.
//!
//! 2. **`TransactionKind` newtype.** ACORD transaction codes (`103`, `1125`,
//!    `203`, `302`, ...) are validated at construction. No bare strings for
//!    transaction identifiers.
//!
//! 3. **`WireFormat`.** The two representations the gateway accepts and
//!    produces, with content-type resolution.
//!
//! 4. **Injected clocks.** Every timestamp the gateway stamps flows through
//!    the [`Clock`] trait so responses are deterministic under a fixed clock.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `acord-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod document;
pub mod error;
pub mod format;
pub mod kind;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use document::{CanonicalDocument, Node, NodeValue, TypeCode};
pub use error::{DocumentError, FormatError, KindError};
pub use format::WireFormat;
pub use kind::TransactionKind;
pub use temporal::{Clock, FixedClock, SystemClock};
