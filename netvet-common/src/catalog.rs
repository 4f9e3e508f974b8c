//! Catalog entries: which test to run, with which inputs, and optionally
//! with outputs captured earlier.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::inputs::{FILTERS_KEY, Filters, InputError};
use crate::types::CommandOutput;

/// One test to instantiate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CatalogEntry {
    /// Registered test name.
    pub test: String,
    /// Raw inputs, validated by the test's input type at construction.
    #[serde(default)]
    pub inputs: Value,
    /// Outputs to replay instead of collecting, one per command in
    /// declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<CommandOutput>>,
}

impl CatalogEntry {
    pub fn new(test: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            inputs: Value::Null,
            outputs: None,
        }
    }

    #[must_use]
    pub fn with_inputs(mut self, inputs: Value) -> Self {
        self.inputs = inputs;
        self
    }

    #[must_use]
    pub fn with_outputs(mut self, outputs: Vec<CommandOutput>) -> Self {
        self.outputs = Some(outputs);
        self
    }

    /// Tag filter from the inputs, read without validating the rest.
    pub fn filters(&self) -> Result<Filters, InputError> {
        match self.inputs.get(FILTERS_KEY) {
            None | Some(Value::Null) => Ok(Filters::default()),
            Some(raw) => serde_json::from_value(raw.clone()).map_err(|source| {
                InputError::InvalidBlock {
                    key: FILTERS_KEY,
                    source,
                }
            }),
        }
    }
}

/// Parse a JSON array of catalog entries.
pub fn parse_catalog(json: &str) -> Result<Vec<CatalogEntry>, serde_json::Error> {
    serde_json::from_str(json)
}
