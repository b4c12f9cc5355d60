//! Deployment form: the flat slot -> text mapping fed to the provisioning template

use crate::config::schema::validate_against_schema;
use crate::error::ConfigError;
use crate::param::value::SENTINEL;
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Deployment parameters keyed by slot name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CfnParams(BTreeMap<String, String>);

/// One record as returned by the provisioning service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParamRecord {
    parameter_key: String,
    parameter_value: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ParamDocument {
    Map(BTreeMap<String, String>),
    Records(Vec<ParamRecord>),
}

impl CfnParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot text, or the sentinel when the slot is absent
    #[must_use]
    pub fn get(&self, slot: &str) -> &str {
        self.0.get(slot).map_or(SENTINEL, String::as_str)
    }

    #[must_use]
    pub fn contains(&self, slot: &str) -> bool {
        self.0.contains_key(slot)
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, slot: K, value: V) {
        self.0.insert(slot.into(), value.into());
    }

    /// Builder form of `insert`
    #[must_use]
    pub fn with<K: Into<String>, V: Into<String>>(mut self, slot: K, value: V) -> Self {
        self.insert(slot, value);
        self
    }

    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(slot, value)| (slot.as_str(), value.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a JSON document holding either an object of strings or a list of
    /// `ParameterKey`/`ParameterValue` records
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not JSON or does not match either shape.
    pub fn from_json(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| ConfigError::configuration(format!("Invalid JSON document: {e}")))?;

        validate_against_schema(&value).context("Deployment parameter validation failed")?;

        let document: ParamDocument = serde_json::from_value(value)
            .map_err(|e| ConfigError::configuration(format!("Invalid parameter document: {e}")))?;

        Ok(match document {
            ParamDocument::Map(map) => Self(map),
            ParamDocument::Records(records) => records
                .into_iter()
                .map(|record| (record.parameter_key, record.parameter_value))
                .collect(),
        })
    }

    /// Pretty JSON object with sorted keys
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize deployment parameters")
    }
}

impl FromIterator<(String, String)> for CfnParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
