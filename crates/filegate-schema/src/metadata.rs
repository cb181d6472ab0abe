//! # Metadata Validation
//!
//! Validates a sidecar metadata record against its schema. When the first
//! attempt fails and coercion is allowed, numeric fields are converted (see
//! [`crate::coerce`]) and the record is validated once more. The second
//! failure, if any, is reported in the same shape as the first.

use filegate_core::{
    FilegateError, Metadata, SchemaViolation, Subject, TypeConversionError, ValidationViolations,
};
use serde_json::Value;

use crate::coerce::{coerce_record, numeric_fields, Coerced};
use crate::engine::CompiledSchema;
use crate::loader;

/// Validate `metadata` against an already-loaded `schema`.
///
/// Returns the record unchanged when it conforms, or the coerced record when
/// coercion was needed and succeeded. The caller's record is never mutated.
///
/// # Errors
///
/// - [`FilegateError::Configuration`] if `schema` is malformed.
/// - [`FilegateError::Violation`] if the record does not conform (after
///   coercion, when allowed). Unconvertible numeric fields are listed on
///   the violation.
pub fn validate_against(
    metadata: &Metadata,
    schema: &Value,
    allow_coercion: bool,
) -> Result<Metadata, FilegateError> {
    loader::ensure_schema("metadata", schema)?;
    let compiled = CompiledSchema::compile("metadata", schema)?;

    let violations = match compiled.check(&Value::Object(metadata.clone())) {
        Ok(()) => return Ok(metadata.clone()),
        Err(violations) => violations,
    };

    if !allow_coercion {
        return Err(rejected(violations, Vec::new()));
    }

    let mask = numeric_fields(schema);
    let Coerced { record, failures } = coerce_record(metadata, &mask);
    tracing::debug!(
        failing = ?violations.fields(),
        fields = ?mask.top_level_numeric(),
        failures = failures.len(),
        "retrying metadata validation with numeric coercion"
    );

    match compiled.check(&Value::Object(record.clone())) {
        Ok(()) => Ok(record),
        Err(violations) => Err(rejected(violations, failures)),
    }
}

fn rejected(
    violations: ValidationViolations,
    conversion_failures: Vec<TypeConversionError>,
) -> FilegateError {
    SchemaViolation::Document {
        subject: Subject::Metadata,
        violations,
        conversion_failures,
    }
    .into()
}
