//! # Validation Engine Adapter
//!
//! Thin wrapper around the `jsonschema` crate. Compiles a schema once and
//! turns engine errors into [`Violation`] records with instance path,
//! schema path, and message.
//!
//! Schemas are interpreted under the draft named by their `$schema`
//! keyword. External `$ref`s are resolved only from local `file://` URIs;
//! anything else is refused, so validation never reaches the network.

use std::fmt;
use std::path::Path;

use filegate_core::{ConfigurationError, ValidationViolations, Violation};
use jsonschema::{Retrieve, Uri, Validator};
use serde_json::Value;

use crate::loader;

/// Retriever that serves `file://` references from disk and refuses the rest.
struct LocalFileRetriever;

impl Retrieve for LocalFileRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();
        match uri_str.strip_prefix("file://") {
            Some(path) => Ok(loader::read_document(Path::new(path))?),
            None => Err(format!("refusing to retrieve non-local schema reference '{uri_str}'").into()),
        }
    }
}

/// A schema compiled for repeated validation.
pub struct CompiledSchema {
    name: String,
    validator: Validator,
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl CompiledSchema {
    /// Compile `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MalformedSchema`] if the engine rejects
    /// the schema itself.
    pub fn compile(name: &str, schema: &Value) -> Result<Self, ConfigurationError> {
        let mut opts = jsonschema::options();
        opts.with_retriever(LocalFileRetriever);

        let validator = opts.build(schema).map_err(|e| ConfigurationError::MalformedSchema {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            name: name.to_string(),
            validator,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validate `instance`, collecting every violation the engine reports.
    pub fn check(&self, instance: &Value) -> Result<(), ValidationViolations> {
        let violations: ValidationViolations = self
            .validator
            .iter_errors(instance)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conforming_instance_passes() {
        let schema = CompiledSchema::compile(
            "t",
            &json!({ "type": "object", "properties": { "a": { "type": "number" } } }),
        )
        .unwrap();
        schema.check(&json!({ "a": 1.5 })).unwrap();
        assert_eq!(schema.name(), "t");
    }

    #[test]
    fn type_mismatch_reports_path_and_message() {
        let schema = CompiledSchema::compile(
            "t",
            &json!({ "type": "object", "properties": { "elevation": { "type": "number" } } }),
        )
        .unwrap();
        let violations = schema.check(&json!({ "elevation": "123" })).unwrap_err();
        assert_eq!(violations.len(), 1);
        let v = &violations[0];
        assert_eq!(v.instance_path, "/elevation");
        assert!(v.message.contains("\"123\""), "got {}", v.message);
        assert!(v.message.contains("is not of type"), "got {}", v.message);
        assert!(v.schema_path.contains("type"));
    }

    #[test]
    fn every_violation_is_collected() {
        let schema = CompiledSchema::compile(
            "t",
            &json!({
                "type": "object",
                "required": ["a", "b"],
                "properties": { "c": { "type": "string" } }
            }),
        )
        .unwrap();
        let violations = schema.check(&json!({ "c": 3 })).unwrap_err();
        assert!(violations.len() >= 3, "got {violations}");
    }

    #[test]
    fn invalid_schema_is_configuration_error() {
        let err = CompiledSchema::compile("broken", &json!({ "type": 12 })).unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedSchema { ref name, .. } if name == "broken"));
    }

    #[test]
    fn local_file_refs_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("number.json");
        std::fs::write(&target, r#"{"type": "number"}"#).unwrap();
        let schema = json!({
            "type": "object",
            "properties": {
                "elevation": { "$ref": format!("file://{}", target.display()) }
            }
        });
        let compiled = CompiledSchema::compile("t", &schema).unwrap();
        compiled.check(&json!({ "elevation": 3 })).unwrap();
        assert!(compiled.check(&json!({ "elevation": "x" })).is_err());
    }
}
