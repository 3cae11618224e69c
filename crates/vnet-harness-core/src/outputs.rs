// crates/vnet-harness-core/src/outputs.rs
// ============================================================================
// Module: Apply Outputs
// Description: Declared output values captured after a successful apply.
// Purpose: Provide typed access to module outputs with typed failures.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`Outputs`] is parsed from `terraform output -json`. Accessors check the
//! value shape explicitly and fail with [`AssertionError::TypeMismatch`]
//! instead of casting.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;

use crate::assertions::AssertionError;
use crate::module::json_kind;
use crate::plan::PlanParseError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One declared output.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputValue {
    /// Output value.
    pub value: Value,
    /// Whether the output is marked sensitive.
    #[serde(default)]
    pub sensitive: bool,
}

/// Output values keyed by output name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outputs {
    /// Outputs by name.
    values: BTreeMap<String, OutputValue>,
}

impl Outputs {
    /// Parses `terraform output -json` output.
    ///
    /// # Errors
    ///
    /// Returns [`PlanParseError::Malformed`] when the document is not an
    /// object of `{ value, sensitive }` records.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, PlanParseError> {
        let values: BTreeMap<String, OutputValue> =
            serde_json::from_slice(bytes).map_err(|err| PlanParseError::Malformed(err.to_string()))?;
        Ok(Self {
            values,
        })
    }

    /// Builds outputs from plain name/value pairs.
    #[must_use]
    pub fn from_values(values: BTreeMap<String, Value>) -> Self {
        let values = values
            .into_iter()
            .map(|(name, value)| {
                (
                    name,
                    OutputValue {
                        value,
                        sensitive: false,
                    },
                )
            })
            .collect();
        Self {
            values,
        }
    }

    /// Returns the raw value of an output.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).map(|output| &output.value)
    }

    /// Returns output names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns true when no outputs were declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a string output.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError`] when the output is missing or not a string.
    pub fn string(&self, name: &str) -> Result<&str, AssertionError> {
        match self.require(name)? {
            Value::String(value) => Ok(value),
            other => Err(mismatch(name, "string", other)),
        }
    }

    /// Returns a mapping output.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError`] when the output is missing or not a mapping.
    pub fn map(&self, name: &str) -> Result<&Map<String, Value>, AssertionError> {
        match self.require(name)? {
            Value::Object(map) => Ok(map),
            other => Err(mismatch(name, "object", other)),
        }
    }

    /// Returns a list-of-strings output.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError`] when the output is missing, not a list, or
    /// contains non-string items.
    pub fn string_list(&self, name: &str) -> Result<Vec<&str>, AssertionError> {
        let value = self.require(name)?;
        let Value::Array(items) = value else {
            return Err(mismatch(name, "array", value));
        };
        items
            .iter()
            .map(|item| item.as_str().ok_or_else(|| mismatch(name, "array of strings", item)))
            .collect()
    }

    /// Returns an output or a missing-output failure.
    fn require(&self, name: &str) -> Result<&Value, AssertionError> {
        self.get(name).ok_or_else(|| AssertionError::MissingOutput {
            name: name.to_string(),
            available: self.values.keys().cloned().collect::<Vec<_>>().join(", "),
        })
    }
}

/// Builds a type mismatch for output `name`.
fn mismatch(name: &str, expected: &'static str, actual: &Value) -> AssertionError {
    AssertionError::TypeMismatch {
        address: format!("output.{name}"),
        attribute: "value".to_string(),
        expected,
        actual: json_kind(actual).to_string(),
    }
}
