//! Parameter instances
//!
//! A `Param` pairs a schema leaf with exactly one materialized value, taken
//! from the deployment form, the file form or the schema default, in that
//! order of precedence. Decoding and encoding dispatch on `ParamKind` in one
//! place per direction.

pub mod conditional;
pub mod settings;
pub mod value;

use crate::config::ClusterConfig;
use crate::config::deployment::CfnParams;
use crate::config::ini::{IniDocument, IniSection};
use crate::error::{ConfigError, Result};
use crate::oracle::Oracle;
use crate::schema::{AllowedValues, ParamKind, ParamSchema, SectionSchema};
use crate::section::Section;
use crate::section::materialize::Materializer;
use crate::validation::{ValidationContext, ValidationMode, ValidationReport};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};
use tracing::debug;
use value::{ParamValue, ScalarKind, is_absent, parse_json, parse_scalar, split_list};

/// Where a parameter takes its value from
#[derive(Debug, Clone, Copy)]
pub enum Origin<'a> {
    /// Schema default
    Default,
    /// The parameter's own block in the file form
    File {
        document: &'a IniDocument,
        section: &'a IniSection,
    },
    /// The parameter's own slot in the deployment form
    Deployment(&'a CfnParams),
    /// Text cut out of a shared comma-joined slot
    Slot(&'a str),
}

/// One parameter of a section
#[derive(Debug, Clone)]
pub struct Param<'s> {
    schema: &'s ParamSchema,
    value: ParamValue,
}

impl PartialEq for Param<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.schema.key == other.schema.key && self.value == other.value
    }
}

impl<'s> Param<'s> {
    #[must_use]
    pub const fn new(schema: &'s ParamSchema, value: ParamValue) -> Self {
        Self { schema, value }
    }

    /// A parameter holding its schema default
    #[must_use]
    pub fn with_default(schema: &'s ParamSchema) -> Self {
        Self::new(schema, schema.default.clone())
    }

    /// Build a parameter from `origin`
    ///
    /// `owner` is the declaration of the section holding the parameter.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for text that does not coerce to the
    /// declared type or is not among the allowed values, and propagates
    /// errors from referred sections and lookups.
    pub fn materialize(
        m: &mut Materializer<'s, '_>,
        owner: &'s SectionSchema,
        schema: &'s ParamSchema,
        origin: Origin<'_>,
    ) -> Result<Self> {
        match schema.kind {
            ParamKind::Settings { section } => settings::materialize_single(m, schema, section, origin),
            ParamKind::MultiSettings {
                section,
                max,
                count_slot,
            } => settings::materialize_multi(m, schema, section, max, count_slot, origin),
            ParamKind::Conditional { scalar, slot } => match origin {
                Origin::Deployment(cfn) => {
                    conditional::decode(owner, schema, scalar, slot, cfn).map(|v| Self::new(schema, v))
                }
                _ => Self::materialize_plain(schema, origin),
            },
            ParamKind::AvailabilityZone { subnet_param } => match origin {
                Origin::File { section, .. } => {
                    let value = match section.get(subnet_param).map(str::trim) {
                        Some(subnet) if !subnet.is_empty() => {
                            ParamValue::String(m.oracle().availability_zone(subnet)?)
                        }
                        _ => schema.default.clone(),
                    };
                    let param = Self::new(schema, value);
                    param.check_allowed()?;
                    Ok(param)
                }
                _ => Self::materialize_plain(schema, origin),
            },
            ParamKind::Scalar(_) | ParamKind::List | ParamKind::Json => {
                Self::materialize_plain(schema, origin)
            }
        }
    }

    fn materialize_plain(schema: &'s ParamSchema, origin: Origin<'_>) -> Result<Self> {
        match origin {
            Origin::Default => Ok(Self::with_default(schema)),
            Origin::File { section, .. } => match section.get(schema.key) {
                Some(text) => {
                    let param = Self::new(schema, decode_text(schema, text)?);
                    param.check_allowed()?;
                    Ok(param)
                }
                None => {
                    debug!("Setting default value '{}' for key '{}'", schema.default, schema.key);
                    Ok(Self::with_default(schema))
                }
            },
            Origin::Deployment(cfn) => match schema.cfn {
                Some(slot) => {
                    let text = cfn.get(slot);
                    if schema.defer_to.is_some() && text.contains(',') {
                        // the slot currently carries per-instance values of the deferred kind
                        return Ok(Self::with_default(schema));
                    }
                    Ok(Self::new(schema, decode_slot(schema, text)?))
                }
                None => Ok(Self::with_default(schema)),
            },
            Origin::Slot(text) => Ok(Self::new(schema, decode_slot(schema, text)?)),
        }
    }

    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.schema.key
    }

    #[must_use]
    pub const fn schema(&self) -> &'s ParamSchema {
        self.schema
    }

    #[must_use]
    pub const fn value(&self) -> &ParamValue {
        &self.value
    }

    /// Whether the value equals the schema default; the sparse-write predicate
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.value == self.schema.default
    }

    /// Replace the value, enforcing the allowed values
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the value is not allowed.
    pub fn set_value(&mut self, value: ParamValue) -> Result<()> {
        let previous = core::mem::replace(&mut self.value, value);
        if let Err(e) = self.check_allowed() {
            self.value = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Verify the value against the declared set or pattern
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the key and the allowed values.
    pub fn check_allowed(&self) -> Result<()> {
        let (Some(allowed), Some(text)) = (self.schema.allowed, self.value.text()) else {
            return Ok(());
        };

        let accepted = match allowed {
            AllowedValues::OneOf(values) => values.contains(&text.as_str()),
            AllowedValues::Pattern(pattern) => compiled_pattern(pattern)
                .map_err(|e| {
                    ConfigError::configuration(format!(
                        "Invalid allowed-values pattern for '{}': {e}",
                        self.schema.key
                    ))
                })?
                .is_match(&text),
        };

        if accepted {
            Ok(())
        } else {
            Err(ConfigError::configuration(format!(
                "The configuration parameter '{}' has an invalid value '{}'\nAllowed values are: {}",
                self.schema.key, text, allowed
            )))
        }
    }

    /// Text of this parameter inside a deployment slot
    #[must_use]
    pub fn slot_text(&self) -> String {
        self.value.slot_text()
    }

    /// Value to write under this key in the file form, if any
    #[must_use]
    pub fn file_entry(&self, config: &ClusterConfig<'_>) -> Option<String> {
        match self.schema.kind {
            ParamKind::AvailabilityZone { .. } => None,
            ParamKind::Settings { section } => settings::single_file_entry(self, section, config),
            ParamKind::MultiSettings { section, .. } => {
                settings::multi_file_entry(self, section, config)
            }
            ParamKind::Scalar(_)
            | ParamKind::List
            | ParamKind::Json
            | ParamKind::Conditional { .. } => {
                if self.value.is_none() || self.is_default() {
                    return None;
                }
                if self
                    .schema
                    .defer_to
                    .is_some_and(|kind| config.has_sections(kind))
                {
                    return None;
                }
                self.value.text()
            }
        }
    }

    /// Write the sections referred to by this parameter into the file form
    pub fn write_referred(&self, config: &ClusterConfig<'_>, document: &mut IniDocument) {
        settings::write_referred(self, config, document);
    }

    /// Add this parameter's deployment slots to `out`
    ///
    /// # Errors
    ///
    /// Propagates lookup and schema errors from referred sections.
    pub fn to_cfn(
        &self,
        owner: &Section<'_>,
        config: &ClusterConfig<'_>,
        oracle: &dyn Oracle,
        out: &mut CfnParams,
    ) -> Result<()> {
        match self.schema.kind {
            ParamKind::Settings { section } => {
                settings::single_to_cfn(self, section, config, oracle, out)
            }
            ParamKind::MultiSettings {
                section,
                max,
                count_slot,
            } => settings::multi_to_cfn(self, section, max, count_slot, config, out),
            ParamKind::Conditional { slot, .. } => {
                conditional::encode(self, slot, owner, out);
                Ok(())
            }
            ParamKind::Scalar(_)
            | ParamKind::List
            | ParamKind::Json
            | ParamKind::AvailabilityZone { .. } => {
                let Some(slot) = self.schema.cfn else {
                    return Ok(());
                };
                if self
                    .schema
                    .defer_to
                    .is_some_and(|kind| config.has_sections(kind))
                {
                    return Ok(());
                }
                out.insert(slot, self.slot_text());
                Ok(())
            }
        }
    }

    /// Run the parameter's validator
    ///
    /// # Errors
    ///
    /// Returns a validation error when the validator reports errors in
    /// fail-fast mode.
    pub fn validate(
        &self,
        ctx: &ValidationContext<'_>,
        mode: ValidationMode,
        report: &mut ValidationReport,
    ) -> Result<()> {
        let key = self.schema.key;
        match self.schema.validator {
            None => {
                debug!("Configuration parameter '{}' has no validator", key);
                Ok(())
            }
            Some(_) if self.value.is_none() => {
                debug!("Configuration parameter '{}' has not a value", key);
                Ok(())
            }
            Some(validator) => {
                let findings = validator(key, &self.value, ctx);
                if findings.is_clean() {
                    debug!("Configuration parameter '{}' is valid", key);
                }
                report.record(
                    mode,
                    &format!(
                        "The configuration parameter '{key}' has an invalid value '{}'",
                        self.value
                    ),
                    &format!(
                        "The configuration parameter '{key}' has a wrong value '{}'",
                        self.value
                    ),
                    findings,
                )
            }
        }
    }
}

/// Anchored allowed-value patterns, compiled once per process
static PATTERNS: LazyLock<Mutex<HashMap<&'static str, Regex>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn compiled_pattern(pattern: &'static str) -> core::result::Result<Regex, regex::Error> {
    let mut patterns = PATTERNS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(regex) = patterns.get(pattern) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(&format!("^(?:{pattern})$"))?;
    patterns.insert(pattern, regex.clone());
    Ok(regex)
}

const fn scalar_kind(kind: ParamKind) -> Option<ScalarKind> {
    match kind {
        ParamKind::Scalar(scalar) | ParamKind::Conditional { scalar, .. } => Some(scalar),
        ParamKind::AvailabilityZone { .. } | ParamKind::Settings { .. } => {
            Some(ScalarKind::String)
        }
        ParamKind::List | ParamKind::Json | ParamKind::MultiSettings { .. } => None,
    }
}

/// Decode text written in the file form; empty text means the default
///
/// # Errors
///
/// Returns a configuration error when the text does not coerce to the
/// declared type.
pub fn decode_text(schema: &ParamSchema, text: &str) -> Result<ParamValue> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(schema.default.clone());
    }
    match schema.kind {
        ParamKind::List | ParamKind::MultiSettings { .. } => Ok(ParamValue::List(split_list(text))),
        ParamKind::Json => parse_json(schema.key, text),
        kind => parse_scalar(
            schema.key,
            scalar_kind(kind).unwrap_or(ScalarKind::String),
            text,
        ),
    }
}

/// Decode deployment slot text; the sentinel means the default
///
/// # Errors
///
/// Returns a configuration error when the text does not coerce to the
/// declared type.
pub fn decode_slot(schema: &ParamSchema, text: &str) -> Result<ParamValue> {
    if is_absent(text) {
        return Ok(schema.default.clone());
    }
    decode_text(schema, text)
}
