//! Exact-match metadata filters.
//!
//! A [`MetadataFilter`] is an AND over named metadata fields: an entry
//! matches when every field in the filter is present in the entry's
//! metadata with an equal value. Both index backends evaluate filters
//! through [`MetadataFilter::matches`] so their semantics cannot drift.
//!
//! Only scalar values are accepted. Operator syntax (`$and`, `$gt`, ...)
//! and nested values are rejected as [`Error::InvalidFilter`].

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::Metadata;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetadataFilter {
    fields: Metadata,
}

impl MetadataFilter {
    /// An empty filter, which matches every entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a filter from a JSON value, which must be an object of scalars.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Self::from_map(fields),
            Value::Null => Ok(Self::new()),
            other => Err(Error::InvalidFilter(format!(
                "filter must be a JSON object, got {}",
                other
            ))),
        }
    }

    /// Build a filter from a metadata map, validating every field.
    pub fn from_map(fields: Metadata) -> Result<Self> {
        for (key, value) in &fields {
            validate_field(key, value)?;
        }
        Ok(Self { fields })
    }

    /// Add or overwrite one field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        self.set(key, value)?;
        Ok(self)
    }

    /// Add or overwrite one field in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        validate_field(&key, &value)?;
        self.fields.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &Metadata {
        &self.fields
    }

    /// True when every filter field is present in `metadata` with an equal value.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.fields.iter().all(|(key, expected)| {
            metadata
                .get(key)
                .is_some_and(|actual| scalar_eq(expected, actual))
        })
    }
}

fn validate_field(key: &str, value: &Value) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidFilter("filter keys must be non-empty".into()));
    }
    if key.starts_with('$') {
        return Err(Error::InvalidFilter(format!(
            "operator '{}' is not supported; filters are exact-match only",
            key
        )));
    }
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(()),
        Value::Null => Err(Error::InvalidFilter(format!(
            "filter field '{}' is null",
            key
        ))),
        Value::Array(_) | Value::Object(_) => Err(Error::InvalidFilter(format!(
            "filter field '{}' must be a string, number, or bool",
            key
        ))),
    }
}

/// Numbers compare by value so `7` and `7.0` are equal; other scalars compare exactly.
fn scalar_eq(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        (a, b) => a == b,
    }
}
