//! # Schema Subcommand
//!
//! Lists the registered forms and exports any form's request or response
//! schema as JSON Schema.

use anyhow::Result;
use clap::{Args, Subcommand};

use acord_core::TransactionKind;
use acord_schema::{to_json_schema, SchemaRegistry};

/// Arguments for the `acord schema` subcommand.
#[derive(Args, Debug)]
pub struct SchemaArgs {
    #[command(subcommand)]
    pub command: SchemaCommand,
}

/// Schema operations.
#[derive(Subcommand, Debug)]
pub enum SchemaCommand {
    /// List every registered form.
    List,

    /// Print a form's schema as JSON Schema.
    Show {
        /// Transaction kind (`103`, `ACORD1125`, ...).
        kind: TransactionKind,

        /// Show the success response schema instead of the request schema.
        #[arg(long)]
        response: bool,
    },
}

/// Execute the schema subcommand.
pub fn run_schema(args: &SchemaArgs, registry: &SchemaRegistry) -> Result<u8> {
    match &args.command {
        SchemaCommand::List => {
            println!(
                "{:<10} {:<6} {:<11} {:<36} CORRELATION",
                "KIND", "METHOD", "DISPOSITION", "TITLE"
            );
            for form in registry.forms() {
                let disposition = format!("{:?}", form.disposition()).to_lowercase();
                println!(
                    "{:<10} {:<6} {:<11} {:<36} {}",
                    form.kind().to_string(),
                    form.method().as_str(),
                    disposition,
                    form.title(),
                    form.correlation_path()
                );
            }
            Ok(0)
        }
        SchemaCommand::Show { kind, response } => {
            let form = registry.lookup(*kind)?;
            let root = if *response {
                form.response()
            } else {
                form.request()
            };
            println!("{}", serde_json::to_string_pretty(&to_json_schema(root))?);
            Ok(0)
        }
    }
}
