//! # Validate and Metadata Subcommands
//!
//! `filegate validate` judges a full submission (metadata, filename, header)
//! against a definition. `filegate metadata` checks a metadata record on its
//! own.
//!
//! Both print `ACCEPT <subject>` followed by the validated metadata, or
//! `REJECT <subject>` followed by the violation report. Configuration and I/O
//! errors are returned to the caller, which exits with
//! [`EXIT_ERROR`](crate::EXIT_ERROR).

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use filegate_core::{FilegateError, Metadata, ShortHeaderPolicy, ValidationOptions};
use filegate_schema::{FileValidator, SchemaOverrides, SchemaSource};

use crate::{exit_code_for, parse_metadata_arg, EXIT_ACCEPTED};

/// Command-line spelling of [`ShortHeaderPolicy`].
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShortHeaderArg {
    Tolerate,
    Reject,
}

impl From<ShortHeaderArg> for ShortHeaderPolicy {
    fn from(arg: ShortHeaderArg) -> Self {
        match arg {
            ShortHeaderArg::Tolerate => ShortHeaderPolicy::Tolerate,
            ShortHeaderArg::Reject => ShortHeaderPolicy::Reject,
        }
    }
}

/// Arguments for the `filegate validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// The data file to judge.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Definition document naming the metadata, filename and header schemas.
    #[arg(long, value_name = "DEF")]
    pub definition: PathBuf,

    /// Metadata record: inline JSON object, or a JSON/YAML file path.
    #[arg(long, value_name = "JSON|PATH")]
    pub metadata: String,

    /// Metadata schema, used instead of the definition's reference.
    #[arg(long, value_name = "SCHEMA")]
    pub metadata_schema: Option<PathBuf>,

    /// Filename schema, used instead of the definition's reference.
    #[arg(long, value_name = "SCHEMA")]
    pub filename_schema: Option<PathBuf>,

    /// Header schema, used instead of the definition's reference.
    #[arg(long, value_name = "SCHEMA")]
    pub header_schema: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,

    /// What to do when the file is shorter than the declared header.
    #[arg(long, value_enum)]
    pub short_header: Option<ShortHeaderArg>,
}

/// Arguments for the `filegate metadata` subcommand.
#[derive(Args, Debug)]
pub struct MetadataArgs {
    /// Metadata record: inline JSON object, or a JSON/YAML file path.
    #[arg(value_name = "JSON|PATH")]
    pub metadata: String,

    /// Metadata schema file.
    #[arg(long, value_name = "SCHEMA")]
    pub schema: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Flags shared by both subcommands.
#[derive(Args, Debug, Default)]
pub struct CommonArgs {
    /// Convert numeric strings before re-validating rejected metadata.
    #[arg(long)]
    pub coerce: bool,

    /// Keep parsed schema files in memory for the run.
    #[arg(long)]
    pub cache: bool,
}

impl CommonArgs {
    /// Flags only switch options on; a config file setting is never cleared.
    fn apply(&self, mut options: ValidationOptions) -> ValidationOptions {
        if self.coerce {
            options = options.with_coercion(true);
        }
        if self.cache {
            options = options.with_cache(true);
        }
        options
    }
}

/// Execute `filegate validate`.
pub fn run_validate(
    args: &ValidateArgs,
    options: ValidationOptions,
    out: &mut dyn Write,
) -> Result<u8> {
    let mut options = args.common.apply(options);
    if let Some(policy) = args.short_header {
        options = options.with_short_header(policy.into());
    }
    tracing::debug!(?options, file = %args.file.display(), "validating submission");

    let metadata = parse_metadata_arg(&args.metadata)?;
    let overrides = SchemaOverrides {
        metadata: args.metadata_schema.clone().map(SchemaSource::Path),
        filename: args.filename_schema.clone().map(SchemaSource::Path),
        header: args.header_schema.clone().map(SchemaSource::Path),
    };
    let definition = SchemaSource::Path(args.definition.clone());

    let validator = FileValidator::new(options);
    let outcome = validator
        .validate_file(&args.file, &metadata, &definition, overrides)
        .map(|validated| validated.metadata);
    report(&args.file.display().to_string(), outcome, out)
}

/// Execute `filegate metadata`.
pub fn run_metadata(
    args: &MetadataArgs,
    options: ValidationOptions,
    out: &mut dyn Write,
) -> Result<u8> {
    let options = args.common.apply(options);
    let metadata = parse_metadata_arg(&args.metadata)?;
    let schema = SchemaSource::Path(args.schema.clone());

    let outcome = FileValidator::new(options).validate_metadata(&metadata, &schema);
    report("metadata", outcome, out)
}

/// Print the verdict for `subject`. Violations become exit code 1; any
/// other library error is propagated.
fn report(
    subject: &str,
    outcome: Result<Metadata, FilegateError>,
    out: &mut dyn Write,
) -> Result<u8> {
    match outcome {
        Ok(metadata) => {
            writeln!(out, "ACCEPT {subject}")?;
            writeln!(out, "{}", serde_json::to_string_pretty(&metadata)?)?;
            Ok(EXIT_ACCEPTED)
        }
        Err(err) if err.is_violation() => {
            writeln!(out, "REJECT {subject}")?;
            writeln!(out, "{err}")?;
            Ok(exit_code_for(&err))
        }
        Err(err) => Err(err).with_context(|| format!("cannot validate {subject}")),
    }
}
