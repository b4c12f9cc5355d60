//! Materialized parameter values and their text encodings

use crate::error::{ConfigError, Result};
use std::fmt;

/// Deployment-form spelling of an absent value
pub const SENTINEL: &str = "NONE";

/// Scalar type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScalarKind {
    String,
    Int,
    Float,
    Bool,
}

/// A typed parameter value
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ParamValue {
    None,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<String>),
    Json(serde_json::Value),
}

impl ParamValue {
    #[must_use]
    pub fn string<S: Into<String>>(value: S) -> Self {
        Self::String(value.into())
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(*self, Self::None)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match *self {
            Self::Int(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match *self {
            Self::Float(value) => Some(value),
            Self::Int(value) => Some(value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(values) => Some(values),
            _ => None,
        }
    }

    /// Text written to the file form, `None` for an absent value
    #[must_use]
    pub fn text(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::String(value) => Some(value.clone()),
            Self::Int(value) => Some(value.to_string()),
            Self::Float(value) => Some(value.to_string()),
            Self::Bool(value) => Some(value.to_string()),
            Self::List(values) => Some(values.join(",")),
            Self::Json(value) => Some(value.to_string()),
        }
    }

    /// Text written to a deployment slot; absent values become the sentinel
    #[must_use]
    pub fn slot_text(&self) -> String {
        match self {
            Self::List(values) if values.is_empty() => SENTINEL.to_owned(),
            _ => self.text().unwrap_or_else(|| SENTINEL.to_owned()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("None"),
        }
    }
}

/// Split a comma list, trimming every item
#[must_use]
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',').map(|item| item.trim().to_owned()).collect()
}

/// Coerce file text into a scalar value
///
/// # Errors
///
/// Returns a configuration error naming `key` when the text does not parse
/// as the declared type.
pub fn parse_scalar(key: &str, kind: ScalarKind, text: &str) -> Result<ParamValue> {
    let text = text.trim();
    match kind {
        ScalarKind::String => Ok(ParamValue::string(text)),
        ScalarKind::Int => text.parse::<i64>().map(ParamValue::Int).map_err(|_| {
            ConfigError::configuration(format!(
                "Configuration parameter '{key}' must be an Integer, got '{text}'"
            ))
        }),
        ScalarKind::Float => text.parse::<f64>().map(ParamValue::Float).map_err(|_| {
            ConfigError::configuration(format!(
                "Configuration parameter '{key}' must be a Float, got '{text}'"
            ))
        }),
        ScalarKind::Bool => match text {
            "true" => Ok(ParamValue::Bool(true)),
            "false" => Ok(ParamValue::Bool(false)),
            _ => Err(ConfigError::configuration(format!(
                "Configuration parameter '{key}' must be a Boolean, got '{text}'"
            ))),
        },
    }
}

/// Parse a JSON-valued parameter permissively
///
/// # Errors
///
/// Returns a configuration error naming `key` when the text cannot be parsed.
pub fn parse_json(key: &str, text: &str) -> Result<ParamValue> {
    serde_yaml::from_str::<serde_json::Value>(text.trim())
        .map(ParamValue::Json)
        .map_err(|e| {
            ConfigError::configuration(format!("Error parsing JSON parameter '{key}'. {e}"))
        })
}

/// Whether deployment slot text carries no value
#[must_use]
pub fn is_absent(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text == SENTINEL
}
