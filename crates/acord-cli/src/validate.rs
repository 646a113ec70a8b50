//! # Validate Subcommand
//!
//! Checks one document against its form exactly as the gateway would:
//! well-formedness first, then the schema walk, then the correlation id.
//! Every issue is printed, not just the first.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use acord_core::{TransactionKind, WireFormat};
use acord_schema::SchemaRegistry;

use crate::{input_format, read_input};

/// Arguments for the `acord validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Transaction kind (`103`, `ACORD1125`, ...).
    #[arg(long)]
    pub kind: TransactionKind,

    /// Input format. Inferred from the file extension when omitted.
    #[arg(long)]
    pub format: Option<WireFormat>,

    /// Document to validate.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 when valid, 1 when malformed or invalid.
pub fn run_validate(args: &ValidateArgs, registry: &SchemaRegistry) -> Result<u8> {
    let form = registry.lookup(args.kind)?;
    let format = input_format(&args.path, args.format)?;
    let bytes = read_input(&args.path)?;

    let doc = match acord_codec::decode_with(&bytes, format, form.request()) {
        Ok(doc) => doc,
        Err(e) if e.is_malformed() => {
            println!("MALFORMED: {}: {e}", args.path.display());
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    };

    let issues = form.check_request(&doc);
    if issues.is_empty() {
        println!(
            "OK: {} is a valid {} ({}) document",
            args.path.display(),
            form.kind(),
            form.title()
        );
        return Ok(0);
    }

    for issue in &issues {
        println!("  FAIL: {issue}");
    }
    println!(
        "\n{} issue(s) found in {}.",
        issues.len(),
        args.path.display()
    );
    Ok(1)
}
