//! Raw test inputs and the fields every test recognizes.
//!
//! Catalog entries hand over inputs as free-form JSON. Two keys are shared
//! by all tests and stripped before the rest is deserialized into the
//! test-specific input type:
//!
//! - `result_overwrite`: replaces description/categories, sets a custom field.
//! - `filters`: tag filter evaluated by the runner before instantiation.
//!
//! Test-specific input types should use `#[serde(deny_unknown_fields)]` so
//! that typos surface as validation errors.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use schemars::schema::Schema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const RESULT_OVERWRITE_KEY: &str = "result_overwrite";
pub const FILTERS_KEY: &str = "filters";

/// Operator-provided replacements for result metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ResultOverwrite {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub custom_field: Option<String>,
}

/// Tag filter deciding whether a test runs against a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Filters {
    #[serde(default)]
    pub tags: Option<BTreeSet<String>>,
}

impl Filters {
    /// No tag filter matches everything; otherwise any shared tag matches.
    pub fn matches(&self, device_tags: &BTreeSet<String>) -> bool {
        match &self.tags {
            None => true,
            Some(tags) => !tags.is_disjoint(device_tags),
        }
    }
}

/// Input type for tests that take no parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NoInput {}

/// Errors raised while validating raw inputs.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("inputs must be a mapping, got {0}")]
    NotAMapping(&'static str),

    #[error("invalid '{key}' block: {source}")]
    InvalidBlock {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown field(s) {}, expected {}", quoted(.fields), quoted(.expected))]
    UnknownFields {
        fields: Vec<String>,
        expected: Vec<String>,
    },

    #[error("{0}")]
    Invalid(#[source] serde_json::Error),
}

fn quoted(names: &[String]) -> String {
    if names.is_empty() {
        return "no fields".to_string();
    }
    names
        .iter()
        .map(|n| format!("`{n}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validated inputs: the test-specific part plus the shared blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct TestInputs<I> {
    pub input: I,
    pub result_overwrite: Option<ResultOverwrite>,
    pub filters: Option<Filters>,
}

impl<I: DeserializeOwned + JsonSchema> TestInputs<I> {
    /// Validate raw inputs. `null` is treated as an empty mapping.
    ///
    /// Keys outside the input type's schema are rejected whether or not
    /// the type opts into `deny_unknown_fields`.
    pub fn from_value(raw: Value) -> Result<Self, InputError> {
        let mut map = match raw {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            Value::Bool(_) => return Err(InputError::NotAMapping("boolean")),
            Value::Number(_) => return Err(InputError::NotAMapping("number")),
            Value::String(_) => return Err(InputError::NotAMapping("string")),
            Value::Array(_) => return Err(InputError::NotAMapping("array")),
        };

        let result_overwrite = take_block::<ResultOverwrite>(&mut map, RESULT_OVERWRITE_KEY)?;
        let filters = take_block::<Filters>(&mut map, FILTERS_KEY)?;
        reject_unknown_fields::<I>(&map)?;
        let input = serde_json::from_value(Value::Object(map)).map_err(InputError::Invalid)?;

        Ok(Self {
            input,
            result_overwrite,
            filters,
        })
    }
}

/// Compare `map` against the top-level properties of `I`'s schema.
///
/// Types whose schema is not a plain object, or that accept additional
/// properties (a flattened map), are left to serde.
fn reject_unknown_fields<I: JsonSchema>(map: &Map<String, Value>) -> Result<(), InputError> {
    let root = schemars::schema_for!(I);
    let Some(object) = root.schema.object.as_deref() else {
        return Ok(());
    };
    if let Some(additional) = object.additional_properties.as_deref()
        && !matches!(additional, Schema::Bool(false))
    {
        return Ok(());
    }

    let fields: Vec<String> = map
        .keys()
        .filter(|key| !object.properties.contains_key(*key))
        .cloned()
        .collect();
    if fields.is_empty() {
        return Ok(());
    }
    Err(InputError::UnknownFields {
        fields,
        expected: object.properties.keys().cloned().collect(),
    })
}

fn take_block<T: DeserializeOwned>(
    map: &mut Map<String, Value>,
    key: &'static str,
) -> Result<Option<T>, InputError> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| InputError::InvalidBlock { key, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq, JsonSchema)]
    #[serde(deny_unknown_fields)]
    struct VersionInput {
        versions: Vec<String>,
    }

    #[derive(Debug, Deserialize, JsonSchema)]
    struct OpenInput {
        #[serde(default)]
        versions: Vec<String>,
        #[serde(default, rename = "minimumUptime")]
        minimum_uptime: Option<u64>,
    }

    #[derive(Debug, Deserialize, JsonSchema)]
    struct LabelInput {
        #[serde(flatten)]
        labels: std::collections::BTreeMap<String, String>,
    }

    #[test]
    fn test_shared_blocks_are_stripped() {
        let inputs = TestInputs::<VersionInput>::from_value(json!({
            "versions": ["4.30.1F"],
            "result_overwrite": {"description": "Pinned", "custom_field": "CHG-1"},
            "filters": {"tags": ["spine"]},
        }))
        .unwrap();
        assert_eq!(inputs.input.versions, vec!["4.30.1F".to_string()]);
        assert_eq!(
            inputs.result_overwrite.unwrap().custom_field.as_deref(),
            Some("CHG-1")
        );
        assert!(inputs.filters.unwrap().tags.unwrap().contains("spine"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = TestInputs::<VersionInput>::from_value(json!({
            "versions": [],
            "verions": [],
        }))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown field(s) `verions`, expected `versions`"
        );
    }

    #[test]
    fn test_unknown_field_rejected_without_serde_attribute() {
        let err = TestInputs::<OpenInput>::from_value(json!({"verions": ["4.30"]})).unwrap_err();
        match err {
            InputError::UnknownFields { fields, expected } => {
                assert_eq!(fields, vec!["verions".to_string()]);
                assert_eq!(
                    expected,
                    vec!["minimumUptime".to_string(), "versions".to_string()]
                );
            }
            other => panic!("expected unknown fields, got {other:?}"),
        }

        let inputs = TestInputs::<OpenInput>::from_value(json!({
            "minimumUptime": 60,
            "filters": {"tags": ["leaf"]},
        }))
        .unwrap();
        assert_eq!(inputs.input.minimum_uptime, Some(60));
    }

    #[test]
    fn test_open_map_inputs_accept_any_key() {
        let inputs = TestInputs::<LabelInput>::from_value(json!({"site": "dc1"})).unwrap();
        assert_eq!(inputs.input.labels["site"], "dc1");
    }

    #[test]
    fn test_no_input_rejects_everything() {
        let err = TestInputs::<NoInput>::from_value(json!({"vrf": "default"})).unwrap_err();
        assert_eq!(err.to_string(), "unknown field(s) `vrf`, expected no fields");
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let err = TestInputs::<VersionInput>::from_value(json!({})).unwrap_err();
        assert!(err.to_string().contains("versions"));
    }

    #[test]
    fn test_null_is_empty_mapping() {
        let inputs = TestInputs::<NoInput>::from_value(Value::Null).unwrap();
        assert!(inputs.result_overwrite.is_none());
    }

    #[test]
    fn test_non_mapping_is_rejected() {
        let err = TestInputs::<NoInput>::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, InputError::NotAMapping("array")));
    }

    #[test]
    fn test_bad_overwrite_block() {
        let err = TestInputs::<NoInput>::from_value(json!({
            "result_overwrite": {"colour": "red"},
        }))
        .unwrap_err();
        assert!(err.to_string().contains("result_overwrite"));
    }

    #[test]
    fn test_filters_match() {
        let device: BTreeSet<String> = ["leaf".to_string(), "dc1".to_string()].into();
        assert!(Filters::default().matches(&device));
        let leaf = Filters {
            tags: Some(["leaf".to_string()].into()),
        };
        assert!(leaf.matches(&device));
        let spine = Filters {
            tags: Some(["spine".to_string()].into()),
        };
        assert!(!spine.matches(&device));
    }
}
