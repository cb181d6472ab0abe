//! # filegate-cli: Command-Line Interface
//!
//! Provides the `filegate` binary:
//!
//! ```bash
//! filegate validate data/wind_01.txt --definition defs/wind/definition.json \
//!     --metadata '{"location": "Point(12 13.0)", "elevation": "123"}' --coerce
//! filegate metadata sidecar.json --schema defs/wind/metadata.json
//! ```
//!
//! ## Exit Codes
//!
//! - `0`: accepted.
//! - `1`: rejected, the submission violates its schemas.
//! - `2`: configuration or operational error (broken definition, unreadable
//!   file, bad arguments).
//!
//! ## Crate Policy
//!
//! - Argument parsing and output live here; every decision is delegated to
//!   `filegate-schema`.

pub mod config;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use filegate_core::{FilegateError, Metadata};

/// Submission accepted.
pub const EXIT_ACCEPTED: u8 = 0;
/// Submission rejected by its schemas.
pub const EXIT_REJECTED: u8 = 1;
/// Definition, configuration, or I/O problem.
pub const EXIT_ERROR: u8 = 2;

/// Exit code for a library error.
pub fn exit_code_for(err: &FilegateError) -> u8 {
    if err.is_violation() {
        EXIT_REJECTED
    } else {
        EXIT_ERROR
    }
}

/// Parse a metadata argument: inline JSON if it starts with `{`, otherwise
/// the path of a JSON or YAML file.
pub fn parse_metadata_arg(arg: &str) -> Result<Metadata> {
    let trimmed = arg.trim_start();
    let value: serde_json::Value = if trimmed.starts_with('{') {
        serde_json::from_str(trimmed).context("invalid inline metadata JSON")?
    } else {
        let path = Path::new(arg);
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read metadata file {}", path.display()))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("invalid YAML in {}", path.display()))?,
            _ => serde_json::from_str(&content)
                .with_context(|| format!("invalid JSON in {}", path.display()))?,
        }
    };

    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => anyhow::bail!("metadata must be a JSON object, found {other}"),
    }
}
