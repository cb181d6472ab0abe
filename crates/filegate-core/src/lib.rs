//! # filegate-core: Foundational Types
//!
//! Shared vocabulary for the filegate workspace. Every other crate depends
//! on `filegate-core`; it depends on nothing internal.
//!
//! - [`error`]: the error taxonomy: configuration errors, schema
//!   violations, type-conversion failures, and target-file I/O errors.
//! - [`definition`]: the typed definition document that ties together the
//!   metadata, filename, and header schemas of one file type.
//! - [`options`]: validation options, loadable from a config file.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `filegate-*` crates.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod definition;
pub mod error;
pub mod options;

pub use definition::{ContentSection, Definition, DocumentSection, SchemaRef, DEFAULT_ENCODING};
pub use error::{
    ConfigurationError, FilegateError, HeaderMismatch, SchemaViolation, Subject,
    TypeConversionError, ValidationViolations, Violation,
};
pub use options::{ShortHeaderPolicy, ValidationOptions};

/// A metadata record: a flat mapping from field name to scalar value.
pub type Metadata = serde_json::Map<String, serde_json::Value>;
