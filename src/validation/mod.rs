//! Validation of a materialized configuration tree
//!
//! Validators are plain functions referenced by the schema. They report
//! `Findings`; errors abort the run unless the caller collects them.

pub mod validators;

use crate::config::ClusterConfig;
use crate::error::{ConfigError, Result};
use crate::oracle::Oracle;
use crate::param::value::ParamValue;
use crate::section::Section;
use tracing::{error, warn};

/// Validator of a single parameter: `(key, value, context)`
pub type ParamValidator = fn(&str, &ParamValue, &ValidationContext<'_>) -> Findings;

/// Validator of a whole section: `(kind, label, context)`
pub type SectionValidator = fn(&str, &str, &ValidationContext<'_>) -> Findings;

/// Problems reported by one validator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Findings {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Findings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error<S: Into<String>>(&mut self, message: S) {
        self.errors.push(message.into());
    }

    pub fn warning<S: Into<String>>(&mut self, message: S) {
        self.warnings.push(message.into());
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// What validators may consult besides the value under test
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    pub config: &'a ClusterConfig<'a>,
    pub oracle: &'a dyn Oracle,
    pub section_key: &'a str,
    pub section_label: &'a str,
}

impl<'a> ValidationContext<'a> {
    /// The section holding the parameter under test
    #[must_use]
    pub fn section(&self) -> Option<&'a Section<'a>> {
        self.config.section(self.section_key, self.section_label)
    }

    /// Value of a sibling parameter in the section under test
    #[must_use]
    pub fn sibling(&self, key: &str) -> Option<&'a ParamValue> {
        self.section().and_then(|section| section.value(key))
    }
}

/// Whether validator errors abort the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum ValidationMode {
    #[default]
    FailFast,
    Collect,
}

/// Every message produced while validating a tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fold one validator's findings into the report
    ///
    /// `subject` prefixes the messages, e.g. `The section [efs default]`.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the findings contain errors and the
    /// mode is `FailFast`.
    pub fn record(
        &mut self,
        mode: ValidationMode,
        error_subject: &str,
        warning_subject: &str,
        findings: Findings,
    ) -> Result<()> {
        if !findings.errors.is_empty() {
            let message = format!("{error_subject}\n{}", findings.errors.join("\n"));
            if mode == ValidationMode::FailFast {
                return Err(ConfigError::validation(message));
            }
            error!("{}", message);
            self.errors.push(message);
        } else if !findings.warnings.is_empty() {
            let message = format!("{warning_subject}\n{}", findings.warnings.join("\n"));
            warn!("{}", message);
            self.warnings.push(message);
        }
        Ok(())
    }
}
