//! # Definition Document
//!
//! A definition ties together the three schemas of one file type:
//!
//! ```json
//! {
//!   "document": {
//!     "metadataSchema": "metadata.json",
//!     "filenameSchema": "filename.json",
//!     "encoding": "utf-8"
//!   },
//!   "content": { "headerSchema": "header.json" }
//! }
//! ```
//!
//! Each schema reference is either a path (relative paths resolve against
//! the definition's own directory) or an inline schema object. The raw
//! document is checked against the definition meta-schema before it is
//! deserialized into these types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Encoding assumed when a definition does not declare one.
pub const DEFAULT_ENCODING: &str = "utf-8";

/// A parsed definition document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    /// Sidecar-level schemas: metadata and filename.
    pub document: DocumentSection,
    /// File-content schemas.
    pub content: ContentSection,
}

/// The `document` section of a definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSection {
    pub metadata_schema: SchemaRef,
    pub filename_schema: SchemaRef,
    /// Text encoding of the target file.
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

/// The `content` section of a definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSection {
    pub header_schema: SchemaRef,
}

fn default_encoding() -> String {
    DEFAULT_ENCODING.to_string()
}

/// A schema named by a definition: a path reference or an inline document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaRef {
    Path(String),
    Inline(Value),
}

impl Definition {
    /// Encoding of the target file, as declared.
    pub fn encoding(&self) -> &str {
        &self.document.encoding
    }
}
