//! # Numeric Coercion
//!
//! Upstream systems often serialize numbers as text (`"123"`). When a
//! metadata record fails its schema, the metadata validator may retry after
//! converting every field the schema declares as `"number"` to a float.
//!
//! [`numeric_fields`] maps a schema to a [`NumericMask`]. The mask is
//! recursive, but [`coerce_record`] consumes exactly one level: top-level
//! fields flagged `Scalar(true)` are converted, nested objects pass through.

use std::collections::BTreeMap;

use filegate_core::{Metadata, TypeConversionError};
use serde_json::{Number, Value};

use crate::loader::json_type_name;

/// Which parts of a schema are declared numeric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumericMask {
    /// A leaf: `true` if declared `"type": "number"`.
    Scalar(bool),
    /// An object schema: one mask per declared property.
    Object(BTreeMap<String, NumericMask>),
}

impl NumericMask {
    pub fn is_numeric(&self) -> bool {
        matches!(self, NumericMask::Scalar(true))
    }

    /// Mask of a declared property, if this is an object mask.
    pub fn field(&self, name: &str) -> Option<&NumericMask> {
        match self {
            NumericMask::Object(fields) => fields.get(name),
            NumericMask::Scalar(_) => None,
        }
    }

    /// Names of the top-level properties declared numeric.
    pub fn top_level_numeric(&self) -> Vec<&str> {
        match self {
            NumericMask::Object(fields) => fields
                .iter()
                .filter(|(_, mask)| mask.is_numeric())
                .map(|(name, _)| name.as_str())
                .collect(),
            NumericMask::Scalar(_) => Vec::new(),
        }
    }
}

/// Compute the numeric mask of `schema`.
pub fn numeric_fields(schema: &Value) -> NumericMask {
    match schema.get("type").and_then(Value::as_str) {
        Some("number") => NumericMask::Scalar(true),
        Some("object") => {
            let fields = schema
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| {
                    props
                        .iter()
                        .map(|(name, prop)| (name.clone(), numeric_fields(prop)))
                        .collect()
                })
                .unwrap_or_default();
            NumericMask::Object(fields)
        }
        _ => NumericMask::Scalar(false),
    }
}

/// Result of [`coerce_record`].
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    /// The new record. Unconvertible fields keep their original value.
    pub record: Metadata,
    /// Fields flagged numeric whose value could not be converted.
    pub failures: Vec<TypeConversionError>,
}

/// Build a new record with every top-level numeric field converted to `f64`.
pub fn coerce_record(record: &Metadata, mask: &NumericMask) -> Coerced {
    let mut failures = Vec::new();
    let record = record
        .iter()
        .map(|(key, value)| {
            if !mask.field(key).is_some_and(NumericMask::is_numeric) {
                return (key.clone(), value.clone());
            }
            match to_number(value) {
                Ok(number) => (key.clone(), number),
                Err(reason) => {
                    failures.push(TypeConversionError {
                        field: key.clone(),
                        value: value.to_string(),
                        reason,
                    });
                    (key.clone(), value.clone())
                }
            }
        })
        .collect();

    Coerced { record, failures }
}

fn to_number(value: &Value) -> Result<Value, String> {
    let parsed = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("{n} is not representable as a float"))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("{e}"))?,
        other => return Err(format!("{} values are not convertible", json_type_name(other))),
    };
    Number::from_f64(parsed)
        .map(Value::Number)
        .ok_or_else(|| format!("{parsed} is not a finite number"))
}
