//! # Schema Loading
//!
//! Accepts a schema (or definition) either as an in-memory document or as a
//! path reference and hands back the in-memory document uniformly.
//!
//! Documents are parsed as YAML when the file extension is `.yaml`/`.yml`
//! and as JSON otherwise.
//!
//! ## Caching
//!
//! By default every load reads and parses the file again. A [`SchemaCache`]
//! keeps parsed documents keyed by absolute path for as long as the cache
//! lives. Schema files are assumed immutable during a run; there is no
//! invalidation other than [`SchemaCache::clear`].

use std::collections::HashMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use filegate_core::{ConfigurationError, SchemaRef};
use parking_lot::RwLock;
use serde_json::Value;

use crate::paths;

/// Where a schema comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaSource {
    /// An already-parsed document.
    Document(Value),
    /// A file to load.
    Path(PathBuf),
}

impl SchemaSource {
    /// Build a source from a definition's reference, resolving relative
    /// paths against `base_dir`.
    pub fn from_ref(reference: &SchemaRef, base_dir: &Path) -> Result<Self, ConfigurationError> {
        match reference {
            SchemaRef::Path(p) => Ok(SchemaSource::Path(paths::resolve(Path::new(p), base_dir))),
            SchemaRef::Inline(v) => SchemaSource::try_from(v.clone()),
        }
    }

    /// Short description for logs and error messages.
    pub fn describe(&self) -> String {
        match self {
            SchemaSource::Document(_) => "<document>".to_string(),
            SchemaSource::Path(p) => p.display().to_string(),
        }
    }
}

impl From<PathBuf> for SchemaSource {
    fn from(path: PathBuf) -> Self {
        SchemaSource::Path(path)
    }
}

impl From<&Path> for SchemaSource {
    fn from(path: &Path) -> Self {
        SchemaSource::Path(path.to_path_buf())
    }
}

impl From<&str> for SchemaSource {
    fn from(path: &str) -> Self {
        SchemaSource::Path(PathBuf::from(path))
    }
}

impl TryFrom<Value> for SchemaSource {
    type Error = ConfigurationError;

    /// Objects are documents, strings are paths; anything else is rejected.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(_) => Ok(SchemaSource::Document(value)),
            Value::String(s) => Ok(SchemaSource::Path(PathBuf::from(s))),
            other => Err(ConfigurationError::UnsupportedSource {
                found: json_type_name(&other),
            }),
        }
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A loaded document: borrowed from the caller's source, or shared from a
/// file load (possibly via the cache).
#[derive(Debug, Clone)]
pub enum SchemaDocument<'a> {
    Borrowed(&'a Value),
    Shared(Arc<Value>),
}

impl Deref for SchemaDocument<'_> {
    type Target = Value;

    fn deref(&self) -> &Value {
        match self {
            SchemaDocument::Borrowed(v) => v,
            SchemaDocument::Shared(v) => v,
        }
    }
}

/// Process-lifetime cache of parsed documents keyed by absolute path.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct SchemaCache {
    entries: Arc<RwLock<HashMap<PathBuf, Arc<Value>>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Arc<Value>> {
        self.entries.read().get(path).cloned()
    }

    pub fn insert(&self, path: PathBuf, value: Arc<Value>) {
        self.entries.write().insert(path, value);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every cached document.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Loads schema sources, optionally through a [`SchemaCache`].
#[derive(Debug, Clone, Default)]
pub struct SchemaLoader {
    cache: Option<SchemaCache>,
}

impl SchemaLoader {
    /// A loader that reparses every file on every load.
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader backed by `cache`.
    pub fn with_cache(cache: SchemaCache) -> Self {
        Self { cache: Some(cache) }
    }

    pub fn cache(&self) -> Option<&SchemaCache> {
        self.cache.as_ref()
    }

    /// Return the document behind `source`.
    ///
    /// Document sources are returned by reference without copying.
    pub fn load<'a>(&self, source: &'a SchemaSource) -> Result<SchemaDocument<'a>, ConfigurationError> {
        match source {
            SchemaSource::Document(value) => Ok(SchemaDocument::Borrowed(value)),
            SchemaSource::Path(path) => self.load_path(path).map(SchemaDocument::Shared),
        }
    }

    fn load_path(&self, path: &Path) -> Result<Arc<Value>, ConfigurationError> {
        let Some(cache) = &self.cache else {
            return read_document(path).map(Arc::new);
        };

        let key = paths::absolutize(path).map_err(|e| ConfigurationError::SchemaLoad {
            reference: path.display().to_string(),
            reason: format!("cannot resolve path: {e}"),
        })?;
        if let Some(hit) = cache.get(&key) {
            tracing::trace!(path = %key.display(), "schema cache hit");
            return Ok(hit);
        }
        let value = Arc::new(read_document(&key)?);
        cache.insert(key, Arc::clone(&value));
        Ok(value)
    }
}

/// Load `source` without a cache.
pub fn load(source: &SchemaSource) -> Result<SchemaDocument<'_>, ConfigurationError> {
    SchemaLoader::new().load(source)
}

/// Read and parse a JSON or YAML document from disk.
pub fn read_document(path: &Path) -> Result<Value, ConfigurationError> {
    let load_error = |reason: String| ConfigurationError::SchemaLoad {
        reference: path.display().to_string(),
        reason,
    };

    let content =
        std::fs::read_to_string(path).map_err(|e| load_error(format!("cannot read file: {e}")))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "yaml" | "yml" => {
            serde_yaml::from_str(&content).map_err(|e| load_error(format!("invalid YAML: {e}")))
        }
        _ => serde_json::from_str(&content).map_err(|e| load_error(format!("invalid JSON: {e}"))),
    }
}

/// Check that `value` is shaped like a schema: an object carrying `type`.
pub fn ensure_schema(name: &str, value: &Value) -> Result<(), ConfigurationError> {
    let malformed = |reason: String| ConfigurationError::MalformedSchema {
        name: name.to_string(),
        reason,
    };
    let obj = value
        .as_object()
        .ok_or_else(|| malformed(format!("expected an object, found {}", json_type_name(value))))?;
    if !obj.contains_key("type") {
        return Err(malformed("missing \"type\"".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn document_source_is_returned_by_reference() {
        let source = SchemaSource::Document(json!({ "type": "object" }));
        let doc = load(&source).unwrap();
        match (&doc, &source) {
            (SchemaDocument::Borrowed(v), SchemaSource::Document(orig)) => {
                assert!(std::ptr::eq(*v, orig));
            }
            other => panic!("expected borrowed document, got {other:?}"),
        }
    }

    #[test]
    fn load_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "s.json", r#"{"type": "string"}"#);
        let source = SchemaSource::Path(path);
        let doc = load(&source).unwrap();
        assert_eq!(*doc, json!({ "type": "string" }));
    }

    #[test]
    fn load_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "s.yaml", "type: object\nproperties:\n  a:\n    type: number\n");
        let source = SchemaSource::Path(path);
        let doc = load(&source).unwrap();
        assert_eq!(doc["properties"]["a"]["type"], "number");
    }

    #[test]
    fn load_missing_file_is_configuration_error() {
        let err = load(&SchemaSource::from("/nonexistent/schema.json")).unwrap_err();
        assert!(matches!(err, ConfigurationError::SchemaLoad { .. }), "got {err}");
    }

    #[test]
    fn load_invalid_json_reports_reason() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "bad.json", "{ not json");
        let err = load(&SchemaSource::Path(path)).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"), "got {err}");
    }

    #[test]
    fn try_from_value_accepts_object_and_string() {
        assert!(matches!(
            SchemaSource::try_from(json!({ "type": "object" })),
            Ok(SchemaSource::Document(_))
        ));
        assert_eq!(
            SchemaSource::try_from(json!("schemas/m.json")).unwrap(),
            SchemaSource::Path(PathBuf::from("schemas/m.json"))
        );
    }

    #[test]
    fn try_from_value_rejects_other_types() {
        for value in [json!(42), json!(null), json!([1, 2]), json!(true)] {
            let err = SchemaSource::try_from(value).unwrap_err();
            assert!(matches!(err, ConfigurationError::UnsupportedSource { .. }));
        }
    }

    #[test]
    fn from_ref_resolves_relative_paths() {
        let source =
            SchemaSource::from_ref(&SchemaRef::Path("m.json".into()), Path::new("/defs")).unwrap();
        assert_eq!(source, SchemaSource::Path(PathBuf::from("/defs/m.json")));

        let source =
            SchemaSource::from_ref(&SchemaRef::Path("/abs/m.json".into()), Path::new("/defs"))
                .unwrap();
        assert_eq!(source, SchemaSource::Path(PathBuf::from("/abs/m.json")));
    }

    #[test]
    fn from_ref_inline_document() {
        let source = SchemaSource::from_ref(
            &SchemaRef::Inline(json!({ "type": "string" })),
            Path::new("/defs"),
        )
        .unwrap();
        assert_eq!(source, SchemaSource::Document(json!({ "type": "string" })));
    }

    #[test]
    fn cache_serves_repeated_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "s.json", r#"{"type": "string"}"#);
        let cache = SchemaCache::new();
        let loader = SchemaLoader::with_cache(cache.clone());
        let source = SchemaSource::Path(path.clone());

        let first = loader.load(&source).unwrap();
        assert_eq!(cache.len(), 1);

        // Rewriting the file does not change what the cache returns.
        write_file(dir.path(), "s.json", r#"{"type": "number"}"#);
        let second = loader.load(&source).unwrap();
        assert_eq!(*first, *second);
        assert_eq!(second["type"], "string");

        cache.clear();
        assert!(cache.is_empty());
        let third = loader.load(&source).unwrap();
        assert_eq!(third["type"], "number");
    }

    #[test]
    fn uncached_loader_rereads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "s.json", r#"{"type": "string"}"#);
        let loader = SchemaLoader::new();
        let source = SchemaSource::Path(path);
        assert_eq!(loader.load(&source).unwrap()["type"], "string");
        write_file(dir.path(), "s.json", r#"{"type": "number"}"#);
        assert_eq!(loader.load(&source).unwrap()["type"], "number");
        assert!(loader.cache().is_none());
    }

    #[test]
    fn ensure_schema_shape() {
        ensure_schema("metadata", &json!({ "type": "object" })).unwrap();
        let err = ensure_schema("metadata", &json!({ "properties": {} })).unwrap_err();
        assert!(err.to_string().contains("missing \"type\""));
        let err = ensure_schema("filename", &json!("x")).unwrap_err();
        assert!(err.to_string().contains("found string"));
    }
}
