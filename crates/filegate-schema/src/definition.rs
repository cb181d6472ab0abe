//! # Definition Orchestrator
//!
//! Top-level entry point. A call to [`FileValidator::validate_file`]:
//!
//! 1. Loads the definition and checks it against the bundled definition
//!    meta-schema. Definitions are never coerced.
//! 2. Resolves the metadata, filename and header schemas. A definition
//!    loaded from a path resolves its relative references against its own
//!    directory; a definition passed as a document requires the caller to
//!    supply all three schemas.
//! 3. Runs metadata, filename, then header validation. Metadata failures
//!    are reported before the target file is opened.
//!
//! Every schema is loaded and shape-checked before any validation runs, so
//! a broken definition fails the same way for every file.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use filegate_core::{
    ConfigurationError, Definition, FilegateError, Metadata, SchemaRef, ValidationOptions,
};
use serde_json::Value;

use crate::engine::CompiledSchema;
use crate::header::{HeaderSchema, TextEncoding};
use crate::loader::{self, SchemaCache, SchemaLoader, SchemaSource};
use crate::{filename, metadata, paths};

/// Version of the bundled definition meta-schema.
pub const DEFINITION_SCHEMA_VERSION: &str = "1";

/// `$id` the bundled meta-schema must carry; it ends in the version.
pub const DEFINITION_SCHEMA_ID: &str = "urn:filegate:definition:1";

const DEFINITION_META_SCHEMA: &str = include_str!("../schemas/definition.schema.json");

static META_SCHEMA: OnceLock<Result<CompiledSchema, String>> = OnceLock::new();

/// The compiled definition meta-schema, built on first use.
fn meta_schema() -> Result<&'static CompiledSchema, ConfigurationError> {
    META_SCHEMA
        .get_or_init(|| {
            let value = definition_meta_schema().map_err(|e| e.to_string())?;
            CompiledSchema::compile("definition meta", &value).map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|reason| ConfigurationError::MalformedSchema {
            name: "definition meta".to_string(),
            reason: reason.clone(),
        })
}

/// The bundled definition meta-schema document.
///
/// # Errors
///
/// [`ConfigurationError::MalformedSchema`] if the document does not parse or
/// its `$id` is not [`DEFINITION_SCHEMA_ID`].
pub fn definition_meta_schema() -> Result<Value, ConfigurationError> {
    let malformed = |reason: String| ConfigurationError::MalformedSchema {
        name: "definition meta".to_string(),
        reason,
    };
    let value: Value =
        serde_json::from_str(DEFINITION_META_SCHEMA).map_err(|e| malformed(e.to_string()))?;
    match value.get("$id").and_then(Value::as_str) {
        Some(DEFINITION_SCHEMA_ID) => Ok(value),
        other => Err(malformed(format!(
            "expected $id {DEFINITION_SCHEMA_ID:?}, found {other:?}"
        ))),
    }
}

/// Schemas supplied by the caller instead of (or in addition to) the
/// definition's own references. Supplied schemas take precedence.
#[derive(Debug, Clone, Default)]
pub struct SchemaOverrides {
    pub metadata: Option<SchemaSource>,
    pub filename: Option<SchemaSource>,
    pub header: Option<SchemaSource>,
}

impl SchemaOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, source: impl Into<SchemaSource>) -> Self {
        self.metadata = Some(source.into());
        self
    }

    pub fn with_filename(mut self, source: impl Into<SchemaSource>) -> Self {
        self.filename = Some(source.into());
        self
    }

    pub fn with_header(mut self, source: impl Into<SchemaSource>) -> Self {
        self.header = Some(source.into());
        self
    }
}

/// A definition whose three schema sources are known.
#[derive(Debug, Clone)]
pub struct ResolvedDefinition {
    pub definition: Definition,
    pub metadata: SchemaSource,
    pub filename: SchemaSource,
    pub header: SchemaSource,
}

/// An accepted submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFile {
    /// The target path, as given.
    pub path: PathBuf,
    /// The validated metadata, coerced if coercion was needed.
    pub metadata: Metadata,
}

impl ValidatedFile {
    pub fn into_parts(self) -> (PathBuf, Metadata) {
        (self.path, self.metadata)
    }
}

/// Validates file submissions against definitions.
///
/// Holds no per-call state: independent calls may run in parallel.
#[derive(Debug, Clone, Default)]
pub struct FileValidator {
    options: ValidationOptions,
    loader: SchemaLoader,
}

impl FileValidator {
    /// Build a validator. A schema cache is created when
    /// `options.cache_schemas` is set.
    pub fn new(options: ValidationOptions) -> Self {
        let loader = if options.cache_schemas {
            SchemaLoader::with_cache(SchemaCache::new())
        } else {
            SchemaLoader::new()
        };
        Self { options, loader }
    }

    /// Build a validator that shares `cache` with other validators.
    pub fn with_cache(options: ValidationOptions, cache: SchemaCache) -> Self {
        Self {
            options,
            loader: SchemaLoader::with_cache(cache),
        }
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    pub fn cache(&self) -> Option<&SchemaCache> {
        self.loader.cache()
    }

    /// Load `definition`, check it against the meta-schema, and work out
    /// where each of its schemas comes from.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::InvalidDefinition`] if the definition does not
    ///   conform to the meta-schema.
    /// - [`ConfigurationError::MissingSchemas`] if the definition is a
    ///   document and not every schema was supplied.
    pub fn resolve_definition(
        &self,
        definition: &SchemaSource,
        overrides: SchemaOverrides,
    ) -> Result<ResolvedDefinition, ConfigurationError> {
        let document = self.loader.load(definition)?;
        meta_schema()?
            .check(&document)
            .map_err(|violations| ConfigurationError::InvalidDefinition { violations })?;

        let parsed: Definition = serde_json::from_value((*document).clone()).map_err(|e| {
            ConfigurationError::MalformedSchema {
                name: "definition".to_string(),
                reason: e.to_string(),
            }
        })?;

        let SchemaOverrides {
            metadata,
            filename,
            header,
        } = overrides;

        let (metadata, filename, header) = match definition {
            SchemaSource::Path(path) => {
                let base = paths::base_dir_of(path).map_err(|e| ConfigurationError::SchemaLoad {
                    reference: path.display().to_string(),
                    reason: format!("cannot resolve definition directory: {e}"),
                })?;
                let from_definition = |given: Option<SchemaSource>, reference: &SchemaRef| match given {
                    Some(source) => Ok(source),
                    None => SchemaSource::from_ref(reference, &base),
                };
                (
                    from_definition(metadata, &parsed.document.metadata_schema)?,
                    from_definition(filename, &parsed.document.filename_schema)?,
                    from_definition(header, &parsed.content.header_schema)?,
                )
            }
            SchemaSource::Document(_) => match (metadata, filename, header) {
                (Some(m), Some(f), Some(h)) => (m, f, h),
                (m, f, h) => {
                    let missing = [
                        ("metadata", m.is_none()),
                        ("filename", f.is_none()),
                        ("header", h.is_none()),
                    ]
                    .into_iter()
                    .filter_map(|(name, absent)| absent.then_some(name))
                    .collect();
                    return Err(ConfigurationError::MissingSchemas { missing });
                }
            },
        };

        tracing::debug!(
            definition = %definition.describe(),
            metadata = %metadata.describe(),
            filename = %filename.describe(),
            header = %header.describe(),
            "resolved definition"
        );

        Ok(ResolvedDefinition {
            definition: parsed,
            metadata,
            filename,
            header,
        })
    }

    /// Validate `metadata` against the schema behind `schema`, coercing
    /// numeric fields if the options allow it.
    pub fn validate_metadata(
        &self,
        metadata: &Metadata,
        schema: &SchemaSource,
    ) -> Result<Metadata, FilegateError> {
        let schema = self.loader.load(schema)?;
        metadata::validate_against(metadata, &schema, self.options.allow_coercion)
    }

    /// Judge the submission `filepath` + `metadata` against `definition`.
    ///
    /// Returns the path as given and the validated (possibly coerced)
    /// metadata.
    pub fn validate_file(
        &self,
        filepath: &Path,
        metadata: &Metadata,
        definition: &SchemaSource,
        overrides: SchemaOverrides,
    ) -> Result<ValidatedFile, FilegateError> {
        let span = tracing::debug_span!("validate_file", path = %filepath.display());
        let _guard = span.enter();

        let resolved = self.resolve_definition(definition, overrides)?;

        let metadata_schema = self.load_schema("metadata", &resolved.metadata)?;
        let filename_schema = self.load_schema("filename", &resolved.filename)?;
        let header_document = self.load_schema("header", &resolved.header)?;
        let header_schema = HeaderSchema::from_schema(&header_document)?;
        let encoding_label = resolved.definition.encoding();
        let encoding = TextEncoding::from_label(encoding_label)?;

        let validated =
            metadata::validate_against(metadata, &metadata_schema, self.options.allow_coercion)?;
        tracing::debug!(coerced = validated != *metadata, "metadata accepted");

        filename::validate_filename(filepath, &filename_schema)?;
        tracing::debug!("filename accepted");

        header_schema.validate(filepath, encoding, encoding_label, self.options.short_header)?;
        tracing::debug!(lines = header_schema.len(), "header accepted");

        Ok(ValidatedFile {
            path: filepath.to_path_buf(),
            metadata: validated,
        })
    }

    fn load_schema(&self, name: &str, source: &SchemaSource) -> Result<Value, ConfigurationError> {
        let document = self.loader.load(source)?;
        loader::ensure_schema(name, &document)?;
        Ok((*document).clone())
    }
}

/// Validate a submission with default options and the given coercion setting.
pub fn validate_file(
    filepath: &Path,
    metadata: &Metadata,
    definition: &SchemaSource,
    overrides: SchemaOverrides,
    allow_coercion: bool,
) -> Result<ValidatedFile, FilegateError> {
    FileValidator::new(ValidationOptions::default().with_coercion(allow_coercion))
        .validate_file(filepath, metadata, definition, overrides)
}

/// Validate `metadata` against the schema behind `schema`.
pub fn validate_metadata(
    metadata: &Metadata,
    schema: &SchemaSource,
    allow_coercion: bool,
) -> Result<Metadata, FilegateError> {
    FileValidator::new(ValidationOptions::default().with_coercion(allow_coercion))
        .validate_metadata(metadata, schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": { "type": "string" },
                "elevation": { "type": "number" }
            },
            "required": ["location", "elevation"]
        })
    }

    fn filename_schema() -> Value {
        json!({ "type": "string", "pattern": "^wind_.*\\.txt$" })
    }

    fn header_schema() -> Value {
        json!({
            "type": "array",
            "minItems": 1,
            "maxItems": 1,
            "prefixItems": [{ "type": "string", "pattern": "^# Wind" }]
        })
    }

    fn inline_definition() -> SchemaSource {
        SchemaSource::Document(json!({
            "document": {
                "metadataSchema": "metadata.json",
                "filenameSchema": "filename.json"
            },
            "content": { "headerSchema": "header.json" }
        }))
    }

    fn all_overrides() -> SchemaOverrides {
        SchemaOverrides {
            metadata: Some(SchemaSource::Document(metadata_schema())),
            filename: Some(SchemaSource::Document(filename_schema())),
            header: Some(SchemaSource::Document(header_schema())),
        }
    }

    fn record(value: Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn meta_schema_compiles() {
        meta_schema().unwrap();
        let doc = definition_meta_schema().unwrap();
        assert_eq!(doc["required"], json!(["document", "content"]));
    }

    #[test]
    fn meta_schema_id_carries_version() {
        let doc = definition_meta_schema().unwrap();
        assert_eq!(doc["$id"], DEFINITION_SCHEMA_ID);
        let version = DEFINITION_SCHEMA_ID.rsplit(':').next().unwrap();
        assert_eq!(version, DEFINITION_SCHEMA_VERSION);
        assert!(meta_schema().is_ok());
    }

    #[test]
    fn definition_missing_section_is_configuration_error() {
        let definition = SchemaSource::Document(json!({
            "document": { "metadataSchema": "m.json", "filenameSchema": "f.json" }
        }));
        let err = FileValidator::default()
            .resolve_definition(&definition, all_overrides())
            .unwrap_err();
        match err {
            ConfigurationError::InvalidDefinition { violations } => {
                assert!(violations.to_string().contains("content"), "got {violations}");
            }
            other => panic!("expected InvalidDefinition, got {other}"),
        }
    }

    #[test]
    fn definition_with_bad_reference_type_rejected() {
        let definition = SchemaSource::Document(json!({
            "document": { "metadataSchema": 7, "filenameSchema": "f.json" },
            "content": { "headerSchema": "h.json" }
        }));
        let err = FileValidator::default()
            .resolve_definition(&definition, all_overrides())
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidDefinition { .. }));
    }

    #[test]
    fn document_definition_requires_every_schema() {
        let overrides = SchemaOverrides::new().with_filename(SchemaSource::Document(filename_schema()));
        let err = FileValidator::default()
            .resolve_definition(&inline_definition(), overrides)
            .unwrap_err();
        match err {
            ConfigurationError::MissingSchemas { missing } => {
                assert_eq!(missing, vec!["metadata", "header"]);
            }
            other => panic!("expected MissingSchemas, got {other}"),
        }
    }

    #[test]
    fn missing_schemas_fail_before_target_file() {
        let err = validate_file(
            Path::new("/nonexistent/wind_a.txt"),
            &record(json!({})),
            &inline_definition(),
            SchemaOverrides::default(),
            false,
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn metadata_failure_reported_before_target_file_is_opened() {
        // The target does not exist: a metadata violation proves the file
        // was never opened.
        let err = validate_file(
            Path::new("/nonexistent/wind_a.txt"),
            &record(json!({ "location": "x", "elevation": "12" })),
            &inline_definition(),
            all_overrides(),
            false,
        )
        .unwrap_err();
        assert!(err.is_violation(), "got {err}");
    }

    #[test]
    fn filename_failure_reported_before_header() {
        let err = validate_file(
            Path::new("/nonexistent/rain_a.txt"),
            &record(json!({ "location": "x", "elevation": 12 })),
            &inline_definition(),
            all_overrides(),
            false,
        )
        .unwrap_err();
        match err {
            FilegateError::Violation(v) => assert!(v.to_string().starts_with("filename")),
            other => panic!("expected filename violation, got {other}"),
        }
    }

    #[test]
    fn inline_definition_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("wind_a.txt");
        std::fs::write(&target, "# Wind\n1,2\n").unwrap();

        let input = record(json!({ "location": "x", "elevation": "12", "file_id": "f" }));
        let validated = validate_file(&target, &input, &inline_definition(), all_overrides(), true)
            .unwrap();
        assert_eq!(validated.path, target);
        assert_eq!(validated.metadata["elevation"], json!(12.0));
        assert_eq!(validated.metadata["file_id"], json!("f"));
    }

    #[test]
    fn malformed_header_shape_checked_before_metadata() {
        let overrides = SchemaOverrides {
            header: Some(SchemaSource::Document(json!({
                "type": "array", "minItems": 1, "maxItems": 2, "prefixItems": []
            }))),
            ..all_overrides()
        };
        let err = validate_file(
            Path::new("/nonexistent/wind_a.txt"),
            &record(json!({})),
            &inline_definition(),
            overrides,
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FilegateError::Configuration(ConfigurationError::HeaderShape { .. })
        ));
    }

    #[test]
    fn unsupported_encoding_is_configuration_error() {
        let definition = SchemaSource::Document(json!({
            "document": {
                "metadataSchema": "m.json",
                "filenameSchema": "f.json",
                "encoding": "ebcdic"
            },
            "content": { "headerSchema": "h.json" }
        }));
        let err = validate_file(
            Path::new("/nonexistent/wind_a.txt"),
            &record(json!({ "location": "x", "elevation": 1 })),
            &definition,
            all_overrides(),
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FilegateError::Configuration(ConfigurationError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn schema_without_type_is_malformed() {
        let overrides = SchemaOverrides {
            filename: Some(SchemaSource::Document(json!({ "pattern": "^wind" }))),
            ..all_overrides()
        };
        let err = validate_file(
            Path::new("/nonexistent/wind_a.txt"),
            &record(json!({})),
            &inline_definition(),
            overrides,
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FilegateError::Configuration(ConfigurationError::MalformedSchema { ref name, .. }) if name == "filename"
        ));
    }

    #[test]
    fn validated_file_into_parts() {
        let vf = ValidatedFile {
            path: PathBuf::from("a.txt"),
            metadata: record(json!({ "a": 1 })),
        };
        let (path, metadata) = vf.into_parts();
        assert_eq!(path, PathBuf::from("a.txt"));
        assert_eq!(metadata["a"], json!(1));
    }

    #[test]
    fn validator_options_drive_cache() {
        let cached = FileValidator::new(ValidationOptions::default().with_cache(true));
        assert!(cached.cache().is_some());
        assert!(FileValidator::default().cache().is_none());
    }
}
