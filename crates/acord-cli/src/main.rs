//! # acord CLI entry point
//!
//! Parses command-line arguments, loads the schema registry once and
//! dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use acord_cli::schema::{run_schema, SchemaArgs};
use acord_cli::transcode::{run_transcode, TranscodeArgs};
use acord_cli::validate::{run_validate, ValidateArgs};

/// ACORD gateway toolchain.
///
/// Validates ACORD documents offline, converts them between JSON and XML,
/// and inspects the registered transaction forms.
#[derive(Parser, Debug)]
#[command(name = "acord", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Schema registry file. Defaults to the built-in forms.
    #[arg(long, global = true)]
    schemas: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a document against its transaction form.
    Validate(ValidateArgs),

    /// Convert a document between JSON and XML.
    Transcode(TranscodeArgs),

    /// List forms or print a form's JSON Schema.
    Schema(SchemaArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let registry = match acord_cli::load_registry(cli.schemas.as_deref()) {
        Ok(registry) => registry,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(2);
        }
    };

    let result = match cli.command {
        Commands::Validate(args) => run_validate(&args, &registry),
        Commands::Transcode(args) => run_transcode(&args, &registry),
        Commands::Schema(args) => run_schema(&args, &registry),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
