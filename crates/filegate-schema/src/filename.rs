//! Filename validation: the file's base name, as a JSON string, against the
//! filename schema.

use std::path::Path;

use filegate_core::{FilegateError, SchemaViolation, Subject};
use serde_json::Value;

use crate::engine::CompiledSchema;
use crate::loader;

/// Final path component of `path`, extension included.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Validate the base name of `path` against `schema`.
pub fn validate_filename(path: &Path, schema: &Value) -> Result<(), FilegateError> {
    loader::ensure_schema("filename", schema)?;
    let compiled = CompiledSchema::compile("filename", schema)?;
    let name = base_name(path);

    compiled.check(&Value::String(name)).map_err(|violations| {
        SchemaViolation::Document {
            subject: Subject::Filename,
            violations,
            conversion_failures: Vec::new(),
        }
        .into()
    })
}
