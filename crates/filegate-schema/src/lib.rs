//! # filegate-schema: Submission Validation
//!
//! Decides whether a data file submission is accepted, given a definition
//! document that names three schemas:
//!
//! - a **metadata schema** for the sidecar metadata record,
//! - a **filename schema** for the file's base name,
//! - a **header schema** declaring one regular expression per leading line.
//!
//! ## Entry Points
//!
//! - [`validate_file`] / [`FileValidator::validate_file`]: the full check:
//!   definition → metadata → filename → header.
//! - [`validate_metadata`] / [`FileValidator::validate_metadata`]: metadata
//!   only, with optional numeric coercion.
//!
//! ## Modules
//!
//! - [`paths`]: relative/absolute reference resolution.
//! - [`loader`]: documents from memory or disk, optional cache.
//! - [`engine`]: the `jsonschema` adapter.
//! - [`coerce`]: numeric masks and record coercion.
//! - [`metadata`], [`filename`], [`header`]: the three validators.
//! - [`definition`]: the orchestrator and the bundled meta-schema.
//!
//! ## Crate Policy
//!
//! - Depends only on `filegate-core` internally.
//! - No printing; diagnostics go through `tracing` at debug/trace level.
//! - The target file is only read, never written.

pub mod coerce;
pub mod definition;
pub mod engine;
pub mod filename;
pub mod header;
pub mod loader;
pub mod metadata;
pub mod paths;

pub use coerce::{numeric_fields, NumericMask};
pub use definition::{
    validate_file, validate_metadata, FileValidator, ResolvedDefinition, SchemaOverrides,
    ValidatedFile, DEFINITION_SCHEMA_ID, DEFINITION_SCHEMA_VERSION,
};
pub use engine::CompiledSchema;
pub use filename::validate_filename;
pub use header::{validate_header, HeaderSchema, TextEncoding};
pub use loader::{SchemaCache, SchemaDocument, SchemaLoader, SchemaSource};
