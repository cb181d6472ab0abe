//! # Configuration File
//!
//! Validation options may be kept in a YAML (or JSON) file passed with
//! `--config`:
//!
//! ```yaml
//! allow_coercion: true
//! short_header: reject
//! cache_schemas: false
//! ```
//!
//! Missing keys take their defaults. Command-line flags override the file.

use std::path::Path;

use anyhow::{Context, Result};
use filegate_core::ValidationOptions;

/// Load options from `path`, or defaults when no file is given.
pub fn load_options(path: Option<&Path>) -> Result<ValidationOptions> {
    let Some(path) = path else {
        return Ok(ValidationOptions::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(ValidationOptions::default());
    }
    let options: ValidationOptions = serde_yaml::from_str(&content)
        .with_context(|| format!("invalid config file {}", path.display()))?;

    tracing::debug!(config = %path.display(), ?options, "loaded validation options");
    Ok(options)
}
