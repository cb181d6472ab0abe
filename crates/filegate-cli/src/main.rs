//! # filegate CLI entry point
//!
//! Parses command-line arguments, loads the optional configuration file and
//! dispatches to the subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use filegate_cli::config::load_options;
use filegate_cli::validate::{run_metadata, run_validate, MetadataArgs, ValidateArgs};
use filegate_cli::EXIT_ERROR;

/// Accept or reject data file submissions against their definition.
#[derive(Parser, Debug)]
#[command(name = "filegate", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML or JSON file holding validation options.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Judge a data file and its metadata against a definition.
    Validate(ValidateArgs),

    /// Check a metadata record against a metadata schema.
    Metadata(MetadataArgs),
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
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "filegate starting");

    let options = match load_options(cli.config.as_deref()) {
        Ok(options) => options,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = match cli.command {
        Commands::Validate(args) => run_validate(&args, options, &mut out),
        Commands::Metadata(args) => run_metadata(&args, options, &mut out),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
