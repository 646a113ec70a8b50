//! # acord-cli: Command-Line Tool for the ACORD Gateway
//!
//! Provides the `acord` command, which runs the gateway's schema registry,
//! codecs and validator offline, without an HTTP server.
//!
//! ## Subcommands
//!
//! - `acord validate`: check a document against its form.
//! - `acord transcode`: convert a document between JSON and XML.
//! - `acord schema list` / `acord schema show`: inspect the registry.
//!
//! ```bash
//! acord validate --kind 103 new-business.json
//! acord transcode --kind 1125 --to json policy-change.xml
//! acord --schemas forms.yaml schema show 103
//! ```
//!
//! Every subcommand returns exit code 0 on success, 1 when the input is
//! rejected, and 2 on operational errors (unreadable file, bad registry).

pub mod schema;
pub mod transcode;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};

use acord_core::WireFormat;
use acord_schema::SchemaRegistry;

/// Load the registry from `path`, or the built-in forms when absent.
pub fn load_registry(path: Option<&Path>) -> Result<SchemaRegistry> {
    let registry = match path {
        Some(path) => SchemaRegistry::from_path(path)
            .with_context(|| format!("failed to load schema registry from {}", path.display()))?,
        None => SchemaRegistry::standard().context("failed to load built-in schema registry")?,
    };
    tracing::debug!(forms = registry.len(), "loaded schema registry");
    Ok(registry)
}

/// The explicit format, or the one implied by the file extension.
pub fn input_format(path: &Path, explicit: Option<WireFormat>) -> Result<WireFormat> {
    if let Some(format) = explicit {
        return Ok(format);
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(WireFormat::from_extension)
        .with_context(|| {
            format!(
                "cannot infer format of {}; pass --format json or --format xml",
                path.display()
            )
        })
}

/// Read a whole input file.
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}
