//! Declarative schema of sections and parameters
//!
//! The schema is built once and then only read. Every decode, encode and
//! validation call receives it explicitly.

pub mod conditional;
pub mod mapping;

use crate::error::{ConfigError, Result};
use crate::param::value::{ParamValue, ScalarKind};
use crate::validation::{ParamValidator, SectionValidator};
use conditional::ConditionalSlot;
use std::fmt;
use std::sync::LazyLock;

static PCLUSTER: LazyLock<Schema> = LazyLock::new(Schema::pcluster);

/// Shape of a parameter and how it crosses the wire
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub enum ParamKind {
    Scalar(ScalarKind),
    List,
    Json,
    /// Slot shared with another parameter, selected by a discriminant
    Conditional {
        scalar: ScalarKind,
        slot: &'static ConditionalSlot,
    },
    /// Label of a single referred section
    Settings { section: &'static str },
    /// Comma list of labels of a variable number of referred sections
    MultiSettings {
        section: &'static str,
        max: usize,
        count_slot: &'static str,
    },
    /// Never written to the file; resolved from `subnet_param` through a lookup
    AvailabilityZone { subnet_param: &'static str },
}

/// Restriction on the values a parameter accepts from the file form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AllowedValues {
    OneOf(&'static [&'static str]),
    Pattern(&'static str),
}

impl fmt::Display for AllowedValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::OneOf(values) => write!(f, "[{}]", values.join(", ")),
            Self::Pattern(pattern) => f.write_str(pattern),
        }
    }
}

/// Static descriptor of one parameter
pub struct ParamSchema {
    pub key: &'static str,
    pub kind: ParamKind,
    pub default: ParamValue,
    pub allowed: Option<AllowedValues>,
    /// Own deployment slot, when the section is not flattened
    pub cfn: Option<&'static str>,
    /// Section kind that takes over the slot while instances of it exist
    pub defer_to: Option<&'static str>,
    pub validator: Option<ParamValidator>,
}

impl fmt::Debug for ParamSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamSchema")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("allowed", &self.allowed)
            .field("cfn", &self.cfn)
            .field("defer_to", &self.defer_to)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl ParamSchema {
    #[must_use]
    pub const fn new(key: &'static str, kind: ParamKind) -> Self {
        Self {
            key,
            kind,
            default: ParamValue::None,
            allowed: None,
            cfn: None,
            defer_to: None,
            validator: None,
        }
    }

    #[must_use]
    pub const fn string(key: &'static str) -> Self {
        Self::new(key, ParamKind::Scalar(ScalarKind::String))
    }

    #[must_use]
    pub const fn int(key: &'static str) -> Self {
        Self::new(key, ParamKind::Scalar(ScalarKind::Int))
    }

    #[must_use]
    pub const fn float(key: &'static str) -> Self {
        Self::new(key, ParamKind::Scalar(ScalarKind::Float))
    }

    #[must_use]
    pub const fn boolean(key: &'static str) -> Self {
        Self::new(key, ParamKind::Scalar(ScalarKind::Bool))
    }

    #[must_use]
    pub const fn json(key: &'static str) -> Self {
        Self::new(key, ParamKind::Json)
    }

    #[must_use]
    pub const fn list(key: &'static str) -> Self {
        Self::new(key, ParamKind::List)
    }

    #[must_use]
    pub const fn conditional(
        key: &'static str,
        scalar: ScalarKind,
        slot: &'static ConditionalSlot,
    ) -> Self {
        Self::new(key, ParamKind::Conditional { scalar, slot })
    }

    #[must_use]
    pub const fn settings(key: &'static str, section: &'static str) -> Self {
        Self::new(key, ParamKind::Settings { section })
    }

    #[must_use]
    pub fn with_default(mut self, default: ParamValue) -> Self {
        self.default = default;
        self
    }

    #[must_use]
    pub fn default_str(self, default: &str) -> Self {
        self.with_default(ParamValue::string(default))
    }

    #[must_use]
    pub fn default_int(self, default: i64) -> Self {
        self.with_default(ParamValue::Int(default))
    }

    #[must_use]
    pub fn default_bool(self, default: bool) -> Self {
        self.with_default(ParamValue::Bool(default))
    }

    #[must_use]
    pub fn cfn(mut self, slot: &'static str) -> Self {
        self.cfn = Some(slot);
        self
    }

    #[must_use]
    pub fn allowed(mut self, allowed: AllowedValues) -> Self {
        self.allowed = Some(allowed);
        self
    }

    #[must_use]
    pub fn defer_to(mut self, section: &'static str) -> Self {
        self.defer_to = Some(section);
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: ParamValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Deployment slot this parameter reads and writes on its own
    #[must_use]
    pub const fn slot(&self) -> Option<&'static str> {
        match self.kind {
            ParamKind::Conditional { slot, .. } => Some(slot.slot),
            _ => self.cfn,
        }
    }

    /// Referred section kind, for settings parameters
    #[must_use]
    pub const fn referred_section(&self) -> Option<&'static str> {
        match self.kind {
            ParamKind::Settings { section } | ParamKind::MultiSettings { section, .. } => {
                Some(section)
            }
            _ => None,
        }
    }
}

/// Static descriptor of one section kind
pub struct SectionSchema {
    pub key: &'static str,
    /// Label used when none is given
    pub label: Option<&'static str>,
    /// Single slot holding every parameter, comma-joined in declaration order
    pub cfn: Option<&'static str>,
    /// Slot carrying the section label
    pub label_slot: Option<&'static str>,
    /// Parameter whose file system id is checked for a mount target; the
    /// answer is appended to the flattened slot
    pub mount_target_param: Option<&'static str>,
    pub params: Vec<ParamSchema>,
    pub validator: Option<SectionValidator>,
}

impl fmt::Debug for SectionSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionSchema")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("cfn", &self.cfn)
            .field("params", &self.params)
            .field("validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

impl SectionSchema {
    #[must_use]
    pub fn new(key: &'static str, params: Vec<ParamSchema>) -> Self {
        Self {
            key,
            label: None,
            cfn: None,
            label_slot: None,
            mount_target_param: None,
            params,
            validator: None,
        }
    }

    #[must_use]
    pub fn label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    #[must_use]
    pub fn cfn(mut self, slot: &'static str) -> Self {
        self.cfn = Some(slot);
        self
    }

    #[must_use]
    pub fn label_slot(mut self, slot: &'static str) -> Self {
        self.label_slot = Some(slot);
        self
    }

    #[must_use]
    pub fn mount_target_param(mut self, param: &'static str) -> Self {
        self.mount_target_param = Some(param);
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: SectionValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    #[must_use]
    pub fn param(&self, key: &str) -> Option<&ParamSchema> {
        self.params.iter().find(|param| param.key == key)
    }

    /// Header used for this section in the file form
    #[must_use]
    pub fn file_name(&self, label: &str) -> String {
        file_section_name(self.key, label)
    }
}

/// `kind` or `kind label`
#[must_use]
pub fn file_section_name(key: &str, label: &str) -> String {
    if label.is_empty() {
        key.to_owned()
    } else {
        format!("{key} {label}")
    }
}

/// The complete set of section declarations
#[derive(Debug)]
pub struct Schema {
    sections: Vec<SectionSchema>,
    main: Vec<&'static str>,
}

impl Schema {
    /// Assemble a schema from declarations; `main` lists the top-level kinds in file order
    ///
    /// # Errors
    ///
    /// Returns an error if a settings parameter or a main kind names an undeclared section.
    pub fn new(sections: Vec<SectionSchema>, main: Vec<&'static str>) -> Result<Self> {
        let schema = Self { sections, main };
        for key in &schema.main {
            schema.section(key)?;
        }
        for section in &schema.sections {
            for param in &section.params {
                if let Some(referred) = param.referred_section() {
                    schema.section(referred)?;
                }
            }
        }
        Ok(schema)
    }

    /// The cluster configuration schema, shared by the whole process
    #[must_use]
    pub fn global() -> &'static Self {
        &PCLUSTER
    }

    /// A fresh copy of the cluster configuration schema
    #[must_use]
    pub fn pcluster() -> Self {
        Self {
            sections: mapping::sections(),
            main: mapping::MAIN_SECTIONS.to_vec(),
        }
    }

    #[must_use]
    pub fn get_section(&self, key: &str) -> Option<&SectionSchema> {
        self.sections.iter().find(|section| section.key == key)
    }

    /// # Errors
    ///
    /// Returns an error if the section kind is not declared.
    pub fn section(&self, key: &str) -> Result<&SectionSchema> {
        self.get_section(key).ok_or_else(|| {
            ConfigError::configuration(format!("Section kind '{key}' is not declared"))
        })
    }

    pub fn sections(&self) -> impl Iterator<Item = &SectionSchema> {
        self.sections.iter()
    }

    /// Top-level sections in file order
    pub fn main_sections(&self) -> impl Iterator<Item = &SectionSchema> {
        self.main.iter().filter_map(|key| self.get_section(key))
    }

    /// Replace the validator of one parameter
    ///
    /// # Errors
    ///
    /// Returns an error if the section or parameter is not declared.
    pub fn set_param_validator(
        &mut self,
        section: &str,
        key: &str,
        validator: Option<ParamValidator>,
    ) -> Result<()> {
        let param = self
            .sections
            .iter_mut()
            .find(|candidate| candidate.key == section)
            .and_then(|found| found.params.iter_mut().find(|param| param.key == key))
            .ok_or_else(|| {
                ConfigError::configuration(format!(
                    "Parameter '{key}' is not declared in section '{section}'"
                ))
            })?;
        param.validator = validator;
        Ok(())
    }

    /// Replace the validator of one section kind
    ///
    /// # Errors
    ///
    /// Returns an error if the section is not declared.
    pub fn set_section_validator(
        &mut self,
        section: &str,
        validator: Option<SectionValidator>,
    ) -> Result<()> {
        let found = self
            .sections
            .iter_mut()
            .find(|candidate| candidate.key == section)
            .ok_or_else(|| {
                ConfigError::configuration(format!("Section kind '{section}' is not declared"))
            })?;
        found.validator = validator;
        Ok(())
    }

    /// Whether some parameter hands `slot` over to sections of kind `section`
    #[must_use]
    pub fn slot_deferred_to(&self, section: &str, slot: &str) -> bool {
        self.sections
            .iter()
            .flat_map(|candidate| candidate.params.iter())
            .any(|param| param.defer_to == Some(section) && param.cfn == Some(slot))
    }
}
