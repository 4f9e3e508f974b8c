//! Parameter schemas synthesized from template placeholders.
//!
//! A schema is closed: the field set is exactly the placeholder names found
//! in the template text, and values are accepted as opaque JSON.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised when instantiating a [`ParameterSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    /// Supplied keys differ from the schema fields.
    #[error("{}", describe_mismatch(.schema, .missing, .extra))]
    Mismatch {
        schema: String,
        missing: Vec<String>,
        extra: Vec<String>,
    },
}

fn describe_mismatch(schema: &str, missing: &[String], extra: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing parameter(s): {}", missing.join(", ")));
    }
    if !extra.is_empty() {
        parts.push(format!("unexpected parameter(s): {}", extra.join(", ")));
    }
    format!("'{}' {}", schema, parts.join("; "))
}

/// Ordered, closed set of parameter names required by one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSchema {
    name: String,
    fields: Vec<String>,
}

impl ParameterSchema {
    /// Build a schema. Duplicate names collapse to their first occurrence.
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = String>) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for field in fields {
            if !unique.contains(&field) {
                unique.push(field);
            }
        }
        Self {
            name: name.into(),
            fields: unique,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fill the schema with values. Keys must match the field set exactly.
    pub fn instantiate(&self, values: &Map<String, Value>) -> Result<Parameters, ParamError> {
        let missing: Vec<String> = self
            .fields
            .iter()
            .filter(|f| !values.contains_key(f.as_str()))
            .cloned()
            .collect();
        let extra: Vec<String> = values
            .keys()
            .filter(|k| !self.contains(k))
            .cloned()
            .collect();

        if !missing.is_empty() || !extra.is_empty() {
            return Err(ParamError::Mismatch {
                schema: self.name.clone(),
                missing,
                extra,
            });
        }

        let values = self
            .fields
            .iter()
            .filter_map(|f| values.get(f).map(|v| (f.clone(), v.clone())))
            .collect();

        Ok(Parameters {
            schema: self.name.clone(),
            values,
        })
    }
}

/// A filled [`ParameterSchema`], in schema field order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameters {
    schema: String,
    values: Vec<(String, Value)>,
}

impl Parameters {
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Convenience accessor for string-valued parameters.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.values.iter().cloned().collect()
    }
}
