//! # Validation Options
//!
//! Knobs that change how a submission is judged without changing the
//! definition. Deserializable so the CLI can read them from a config file;
//! every field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// What to do when a file has fewer lines than its header schema declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortHeaderPolicy {
    /// Check the lines that exist; unread positions pass unchecked.
    #[default]
    Tolerate,
    /// Fail with [`ConfigurationError::HeaderTooShort`](crate::ConfigurationError::HeaderTooShort).
    Reject,
}

/// Options for a validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Retry failed metadata validation after converting numeric fields.
    pub allow_coercion: bool,
    /// Policy for files shorter than the declared header.
    pub short_header: ShortHeaderPolicy,
    /// Keep parsed schema files for the lifetime of the validator.
    pub cache_schemas: bool,
}

impl ValidationOptions {
    pub fn with_coercion(mut self, allow: bool) -> Self {
        self.allow_coercion = allow;
        self
    }

    pub fn with_short_header(mut self, policy: ShortHeaderPolicy) -> Self {
        self.short_header = policy;
        self
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_schemas = enabled;
        self
    }
}
