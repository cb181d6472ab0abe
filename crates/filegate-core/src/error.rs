//! # Error Hierarchy
//!
//! Structured error types for filegate, built with `thiserror`.
//!
//! Errors fall into two classes that callers must treat differently:
//!
//! - [`ConfigurationError`]: the definition or one of its schemas is broken.
//!   Independent of any particular target file, always fatal, never retried.
//! - [`SchemaViolation`]: the submitted file (its metadata, name, or header
//!   lines) does not conform. This is the "reject" outcome.
//!
//! Target-file I/O and decoding failures are reported separately with the
//! offending path.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Deref;
use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type returned by every validation entry point.
#[derive(Error, Debug)]
pub enum FilegateError {
    /// The definition, a schema, or the validation options are unusable.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The submission does not conform to its definition.
    #[error("schema violation: {0}")]
    Violation(#[from] SchemaViolation),

    /// The target file could not be opened or read.
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        /// Path of the target file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A header line is not valid in the declared encoding.
    #[error("line {line} of '{}' is not valid {encoding}", path.display())]
    Decode {
        /// Path of the target file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Encoding label from the definition.
        encoding: String,
    },
}

impl FilegateError {
    /// True when the definition itself is broken, regardless of the file.
    pub fn is_configuration(&self) -> bool {
        matches!(self, FilegateError::Configuration(_))
    }

    /// True when the submission was rejected by one of its schemas.
    pub fn is_violation(&self) -> bool {
        matches!(self, FilegateError::Violation(_))
    }

    /// Returns the schema violation, if this is one.
    pub fn as_violation(&self) -> Option<&SchemaViolation> {
        match self {
            FilegateError::Violation(v) => Some(v),
            _ => None,
        }
    }
}

/// Errors in the definition, its schemas, or how they were supplied.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// The definition document does not conform to the definition meta-schema.
    #[error("definition does not conform to the definition meta-schema:\n{violations}")]
    InvalidDefinition {
        /// Violations reported against the meta-schema.
        violations: ValidationViolations,
    },

    /// The definition was supplied as a document but some schemas were not.
    #[error("definition supplied as a document requires explicit schemas; missing: {}", missing.join(", "))]
    MissingSchemas {
        /// Names of the schemas that were not supplied.
        missing: Vec<&'static str>,
    },

    /// A schema source was neither a document nor a path reference.
    #[error("unsupported schema source: expected an object (schema document) or a string (path), found {found}")]
    UnsupportedSource {
        /// JSON type name of the rejected value.
        found: &'static str,
    },

    /// A referenced document could not be read or parsed.
    #[error("cannot load '{reference}': {reason}")]
    SchemaLoad {
        /// The reference as resolved.
        reference: String,
        /// Why loading failed.
        reason: String,
    },

    /// A loaded schema is not an object carrying a `type`, or does not compile.
    #[error("malformed {name} schema: {reason}")]
    MalformedSchema {
        /// Which schema (e.g. `"metadata"`).
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The header schema is not a fixed-length `prefixItems` array.
    #[error("header schema must declare minItems == maxItems and one prefixItems entry per line: {reason}")]
    HeaderShape {
        /// What is wrong with the shape.
        reason: String,
    },

    /// A header line pattern is not a valid regular expression.
    #[error("header pattern {index} ({pattern:?}) is invalid: {reason}")]
    InvalidPattern {
        /// 0-based position in `prefixItems`.
        index: usize,
        /// The offending pattern.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// The definition names an encoding that is not supported.
    #[error("unsupported encoding: {0:?}")]
    UnsupportedEncoding(String),

    /// The target file has fewer lines than the header schema declares.
    #[error("file shorter than declared header length: expected {expected} lines, found {found}")]
    HeaderTooShort {
        /// Declared header length.
        expected: usize,
        /// Lines actually available.
        found: usize,
    },
}

/// What a document-level schema violation was reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    /// The sidecar metadata record.
    Metadata,
    /// The file's base name.
    Filename,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Metadata => f.write_str("metadata"),
            Subject::Filename => f.write_str("filename"),
        }
    }
}

/// The submission does not conform to its definition.
#[derive(Error, Debug)]
pub enum SchemaViolation {
    /// A JSON instance (metadata record or filename) failed its schema.
    #[error("{subject} validation failed:\n{violations}{}", render_conversions(conversion_failures))]
    Document {
        /// What was validated.
        subject: Subject,
        /// Violations reported by the schema engine.
        violations: ValidationViolations,
        /// Numeric fields the coercion step could not convert.
        conversion_failures: Vec<TypeConversionError>,
    },

    /// One or more header lines did not match their positional pattern.
    #[error("header validation failed:\n{}", render_mismatches(mismatches))]
    Header {
        /// Every failing position, in file order.
        mismatches: Vec<HeaderMismatch>,
    },
}

impl SchemaViolation {
    /// Engine violations for document-level failures; empty for headers.
    pub fn violations(&self) -> &[Violation] {
        match self {
            SchemaViolation::Document { violations, .. } => violations,
            SchemaViolation::Header { .. } => &[],
        }
    }

    /// Header mismatches; empty for document-level failures.
    pub fn header_mismatches(&self) -> &[HeaderMismatch] {
        match self {
            SchemaViolation::Header { mismatches } => mismatches,
            SchemaViolation::Document { .. } => &[],
        }
    }
}

fn render_conversions(failures: &[TypeConversionError]) -> String {
    failures.iter().map(|c| format!("\n  {c}")).collect()
}

fn render_mismatches(mismatches: &[HeaderMismatch]) -> String {
    mismatches
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// A numeric field whose value could not be converted to a number.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot convert field '{field}' value {value} to a number: {reason}")]
pub struct TypeConversionError {
    /// Metadata field name.
    pub field: String,
    /// The value as JSON text.
    pub value: String,
    /// Why conversion failed.
    pub reason: String,
}

/// A header line that did not match its pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMismatch {
    /// 1-based line number.
    pub line_number: usize,
    /// The line as read, terminator included.
    pub line: String,
    /// The pattern it was checked against.
    pub pattern: String,
}

impl fmt::Display for HeaderMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  line {}: {:?} does not match {:?}",
            self.line_number, self.line, self.pattern
        )
    }
}

/// One failed schema keyword, as reported by the validation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer into the metadata record (or `""` for a filename).
    pub instance_path: String,
    /// JSON Pointer to the keyword in the schema.
    pub schema_path: String,
    pub message: String,
}

impl Violation {
    /// The top-level metadata field this violation is about, if any.
    pub fn field(&self) -> Option<&str> {
        self.instance_path
            .strip_prefix('/')
            .and_then(|rest| rest.split('/').next())
            .filter(|name| !name.is_empty())
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance_path.as_str() {
            "" => write!(f, "  {}", self.message),
            path => write!(f, "  at {path}: {}", self.message),
        }
    }
}

/// Every violation one instance produced against one schema, in engine
/// order. Derefs to a slice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationViolations(Vec<Violation>);

impl ValidationViolations {
    /// Distinct top-level fields named by the violations, sorted.
    pub fn fields(&self) -> BTreeSet<&str> {
        self.0.iter().filter_map(Violation::field).collect()
    }
}

impl FromIterator<Violation> for ValidationViolations {
    fn from_iter<I: IntoIterator<Item = Violation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Deref for ValidationViolations {
    type Target = [Violation];

    fn deref(&self) -> &[Violation] {
        &self.0
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.0.iter().map(Violation::to_string).collect();
        f.write_str(&lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elevation_violation() -> Violation {
        Violation {
            instance_path: "/elevation".to_string(),
            schema_path: "/properties/elevation/type".to_string(),
            message: r#""123" is not of type "number""#.to_string(),
        }
    }

    #[test]
    fn violation_display_includes_path() {
        let display = elevation_violation().to_string();
        assert!(display.contains("/elevation"));
        assert!(display.contains("is not of type"));
    }

    #[test]
    fn violation_display_root() {
        let v = Violation {
            instance_path: String::new(),
            schema_path: "/required".to_string(),
            message: r#""location" is a required property"#.to_string(),
        };
        assert_eq!(v.to_string().trim(), v.message);
    }

    #[test]
    fn document_violation_lists_conversion_failures() {
        let err = SchemaViolation::Document {
            subject: Subject::Metadata,
            violations: std::iter::once(elevation_violation()).collect(),
            conversion_failures: vec![TypeConversionError {
                field: "elevation".to_string(),
                value: r#""high""#.to_string(),
                reason: "invalid float literal".to_string(),
            }],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("metadata validation failed"));
        assert!(msg.contains(r#""123" is not of type "number""#));
        assert!(msg.contains("cannot convert field 'elevation'"));
    }

    #[test]
    fn header_violation_lists_every_line() {
        let err = SchemaViolation::Header {
            mismatches: vec![
                HeaderMismatch {
                    line_number: 1,
                    line: "bad\n".to_string(),
                    pattern: "^# ".to_string(),
                },
                HeaderMismatch {
                    line_number: 3,
                    line: "worse\n".to_string(),
                    pattern: "^time".to_string(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("line 1"));
        assert!(msg.contains("line 3"));
        assert!(msg.contains(r#""^time""#));
        assert_eq!(err.header_mismatches().len(), 2);
        assert!(err.violations().is_empty());
    }

    #[test]
    fn classification_helpers() {
        let config: FilegateError = ConfigurationError::UnsupportedEncoding("ebcdic".into()).into();
        assert!(config.is_configuration());
        assert!(!config.is_violation());
        assert!(config.as_violation().is_none());

        let violation: FilegateError = SchemaViolation::Header { mismatches: vec![] }.into();
        assert!(violation.is_violation());
        assert!(violation.as_violation().is_some());
    }

    #[test]
    fn missing_schemas_message_names_each() {
        let err = ConfigurationError::MissingSchemas {
            missing: vec!["metadata", "header"],
        };
        assert!(err.to_string().contains("metadata, header"));
    }

    #[test]
    fn violations_name_their_fields() {
        let location = Violation {
            instance_path: "/location".to_string(),
            schema_path: "/properties/location/pattern".to_string(),
            message: r#""Pt(1)" does not match "^Point""#.to_string(),
        };
        let vs: ValidationViolations =
            [elevation_violation(), location, elevation_violation()].into_iter().collect();
        assert_eq!(vs.len(), 3);
        assert_eq!(vs.fields().into_iter().collect::<Vec<_>>(), vec!["elevation", "location"]);
        assert_eq!(vs.to_string().lines().count(), 3);
    }

    #[test]
    fn root_violation_has_no_field() {
        let v = Violation {
            instance_path: String::new(),
            schema_path: "/pattern".to_string(),
            message: r#""rain.txt" does not match "^wind_""#.to_string(),
        };
        assert_eq!(v.field(), None);
        assert_eq!(elevation_violation().field(), Some("elevation"));
    }
}
