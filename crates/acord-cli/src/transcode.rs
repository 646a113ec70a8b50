//! # Transcode Subcommand
//!
//! Converts a document between JSON and XML through the canonical tree.
//! Only documents that pass validation are converted: encoding is total
//! for conforming documents, and refusing the rest keeps the output
//! acceptable to the gateway.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use acord_core::{TransactionKind, WireFormat};
use acord_schema::SchemaRegistry;

use crate::{input_format, read_input};

/// Arguments for the `acord transcode` subcommand.
#[derive(Args, Debug)]
pub struct TranscodeArgs {
    /// Transaction kind (`103`, `ACORD1125`, ...).
    #[arg(long)]
    pub kind: TransactionKind,

    /// Output format.
    #[arg(long)]
    pub to: WireFormat,

    /// Input format. Inferred from the file extension when omitted.
    #[arg(long)]
    pub from: Option<WireFormat>,

    /// Write to this file instead of standard output.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Emit compact JSON instead of indented JSON.
    #[arg(long)]
    pub compact: bool,

    /// Document to convert.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}

/// Execute the transcode subcommand.
///
/// Returns exit code: 0 on success, 1 when the input is malformed or invalid.
pub fn run_transcode(args: &TranscodeArgs, registry: &SchemaRegistry) -> Result<u8> {
    let form = registry.lookup(args.kind)?;
    let from = input_format(&args.path, args.from)?;
    let bytes = read_input(&args.path)?;

    let doc = match acord_codec::decode_with(&bytes, from, form.request()) {
        Ok(doc) => doc,
        Err(e) if e.is_malformed() => {
            eprintln!("MALFORMED: {}: {e}", args.path.display());
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    };

    let issues = form.check_request(&doc);
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("  FAIL: {issue}");
        }
        eprintln!("refusing to transcode an invalid {} document", form.kind());
        return Ok(1);
    }

    let mut encoded = match (args.to, args.compact) {
        (WireFormat::Json, false) => acord_codec::json::encode_pretty(&doc)?,
        (format, _) => acord_codec::encode(&doc, format)?,
    };
    encoded.push(b'\n');

    match &args.output {
        Some(path) => std::fs::write(path, &encoded)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => std::io::stdout()
            .lock()
            .write_all(&encoded)
            .context("failed to write to standard output")?,
    }
    tracing::info!(kind = %form.kind(), from = %from, to = %args.to, "document transcoded");
    Ok(0)
}
