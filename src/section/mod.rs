//! Section instances
//!
//! A section is a labelled group of parameters. In the file form it is the
//! `[kind label]` block; in the deployment form its parameters either own
//! slots or, for flattened kinds, share one comma-joined slot.

pub mod materialize;

use crate::config::ClusterConfig;
use crate::config::deployment::CfnParams;
use crate::config::ini::{IniDocument, IniSection};
use crate::error::{ConfigError, Result};
use crate::oracle::Oracle;
use crate::param::settings::indexed_item;
use crate::param::value::{ParamValue, SENTINEL, is_absent};
use crate::param::{Origin, Param};
use crate::schema::{ParamKind, SectionSchema};
use crate::validation::{ValidationContext, ValidationMode, ValidationReport};
use materialize::{Materializer, Presence, Source};
use tracing::{debug, info};

/// One labelled section of a configuration tree
#[derive(Debug, Clone)]
pub struct Section<'s> {
    schema: &'s SectionSchema,
    label: String,
    params: Vec<Param<'s>>,
}

impl PartialEq for Section<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.schema.key == other.schema.key
            && self.label == other.label
            && self.params == other.params
    }
}

impl<'s> Section<'s> {
    /// A section holding every schema default and referring to nothing
    #[must_use]
    pub fn blank(schema: &'s SectionSchema, label: &str) -> Self {
        Self {
            schema,
            label: label.to_owned(),
            params: schema.params.iter().map(Param::with_default).collect(),
        }
    }

    /// Build a section from `source`
    ///
    /// Without an explicit `label` the label comes from the section's label
    /// slot (deployment form only) or the schema default label. Sections
    /// reached through settings parameters are handed to `m`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a missing required block, for keys
    /// the schema does not declare and for values that do not decode.
    pub fn materialize(
        m: &mut Materializer<'s, '_>,
        schema: &'s SectionSchema,
        label: Option<&str>,
        source: Source<'_>,
        presence: Presence,
    ) -> Result<Self> {
        let label = match (label, source, schema.label_slot) {
            (Some(label), ..) => label.to_owned(),
            (None, Source::Deployment(cfn), Some(slot)) if !is_absent(cfn.get(slot)) => {
                cfn.get(slot).trim().to_owned()
            }
            _ => schema.label.unwrap_or_default().to_owned(),
        };
        let mut params = Vec::with_capacity(schema.params.len());

        match source {
            Source::Defaults => {
                for param in &schema.params {
                    params.push(Param::materialize(m, schema, param, Origin::Default)?);
                }
            }
            Source::File(document) => {
                let name = schema.file_name(&label);
                match document.section(&name) {
                    Some(block) => {
                        check_declared(schema, block)?;
                        let origin = Origin::File {
                            document,
                            section: block,
                        };
                        for param in &schema.params {
                            params.push(Param::materialize(m, schema, param, origin)?);
                        }
                    }
                    None if presence == Presence::Required => {
                        return Err(ConfigError::configuration(format!(
                            "Section '[{name}]' not found in the config file."
                        )));
                    }
                    None => {
                        info!("Section '[{}]' not found in the config file. Using defaults.", name);
                        for param in &schema.params {
                            params.push(Param::materialize(m, schema, param, Origin::Default)?);
                        }
                    }
                }
            }
            Source::Deployment(cfn) => match schema.cfn {
                Some(slot) => {
                    let items: Vec<&str> = cfn.get(slot).split(',').map(str::trim).collect();
                    for (index, param) in schema.params.iter().enumerate() {
                        let text = items.get(index).copied().unwrap_or(SENTINEL);
                        params.push(Param::materialize(m, schema, param, Origin::Slot(text))?);
                    }
                }
                None => {
                    for param in &schema.params {
                        params.push(Param::materialize(m, schema, param, Origin::Deployment(cfn))?);
                    }
                }
            },
            Source::DeploymentIndexed(cfn, index) => {
                for param in &schema.params {
                    let text = param
                        .cfn
                        .map_or(SENTINEL, |slot| indexed_item(cfn.get(slot), index));
                    params.push(Param::materialize(m, schema, param, Origin::Slot(text))?);
                }
            }
        }

        Ok(Self {
            schema,
            label,
            params,
        })
    }

    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.schema.key
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn schema(&self) -> &'s SectionSchema {
        self.schema
    }

    /// `[kind label]` header of this section
    #[must_use]
    pub fn file_name(&self) -> String {
        self.schema.file_name(&self.label)
    }

    #[must_use]
    pub fn params(&self) -> &[Param<'s>] {
        &self.params
    }

    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Param<'s>> {
        self.params.iter().find(|param| param.key() == key)
    }

    #[must_use]
    pub fn value(&self, key: &str) -> Option<&ParamValue> {
        self.param(key).map(Param::value)
    }

    /// Replace one parameter value
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an undeclared key or a value that
    /// is not allowed.
    pub fn set_value(&mut self, key: &str, value: ParamValue) -> Result<()> {
        let name = self.file_name();
        self.params
            .iter_mut()
            .find(|param| param.key() == key)
            .ok_or_else(|| {
                ConfigError::configuration(format!(
                    "The configuration parameter '{key}' is not allowed in the [{name}] section"
                ))
            })?
            .set_value(value)
    }

    /// Whether every parameter holds its schema default
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.params.iter().all(Param::is_default)
    }

    /// Whether writing this section to the file form produces any entry
    #[must_use]
    pub fn has_file_entries(&self, config: &ClusterConfig<'_>) -> bool {
        self.params
            .iter()
            .any(|param| param.file_entry(config).is_some())
    }

    /// Write this section and the sections it refers to
    ///
    /// The header only appears when at least one entry is written.
    pub fn to_file(&self, config: &ClusterConfig<'_>, document: &mut IniDocument) {
        let name = self.file_name();
        for param in &self.params {
            if let Some(text) = param.file_entry(config) {
                document.set(&name, param.key(), &text);
            }
        }
        for param in &self.params {
            param.write_referred(config, document);
        }
    }

    /// Add this section's slots, and those of the sections it refers to, to `out`
    ///
    /// # Errors
    ///
    /// Propagates lookup failures and schema errors.
    pub fn to_cfn(
        &self,
        config: &ClusterConfig<'_>,
        oracle: &dyn Oracle,
        out: &mut CfnParams,
    ) -> Result<()> {
        if let Some(slot) = self.schema.cfn {
            let mut items: Vec<String> = self.params.iter().map(Param::slot_text).collect();
            let collapsed = items.first().is_some_and(|first| first == SENTINEL);
            if collapsed {
                items = vec![SENTINEL.to_owned(); items.len()];
            }
            if let Some(fs_param) = self.schema.mount_target_param {
                items.push(self.mount_target_flag(fs_param, collapsed, config, oracle)?);
            }
            out.insert(slot, items.join(","));
        } else {
            for param in &self.params {
                param.to_cfn(self, config, oracle, out)?;
            }
        }

        if let Some(slot) = self.schema.label_slot {
            out.insert(slot, self.label.clone());
        }
        Ok(())
    }

    fn mount_target_flag(
        &self,
        fs_param: &str,
        collapsed: bool,
        config: &ClusterConfig<'_>,
        oracle: &dyn Oracle,
    ) -> Result<String> {
        if collapsed {
            return Ok(SENTINEL.to_owned());
        }
        let Some(fs_id) = self.value(fs_param).and_then(ParamValue::as_str) else {
            return Ok(SENTINEL.to_owned());
        };
        let Some(zone) = config.master_availability_zone() else {
            debug!(
                "Master availability zone unknown, not checking mount targets of '{}'",
                fs_id
            );
            return Ok(SENTINEL.to_owned());
        };
        Ok(match oracle.efs_mount_target(fs_id, zone)? {
            Some(_) => "Valid".to_owned(),
            None => SENTINEL.to_owned(),
        })
    }

    /// Run the section validator and then every parameter validator
    ///
    /// # Errors
    ///
    /// Returns the first validation error in fail-fast mode.
    pub fn validate(
        &self,
        config: &ClusterConfig<'_>,
        oracle: &dyn Oracle,
        mode: ValidationMode,
        report: &mut ValidationReport,
    ) -> Result<()> {
        let name = self.file_name();
        let ctx = ValidationContext {
            config,
            oracle,
            section_key: self.key(),
            section_label: &self.label,
        };

        match self.schema.validator {
            Some(validator) => {
                let findings = validator(self.key(), &self.label, &ctx);
                if findings.is_clean() {
                    debug!("Section '[{}]' is valid", name);
                }
                let subject = format!("The section [{name}] is wrongly configured");
                report.record(mode, &subject, &subject, findings)?;
            }
            None => debug!("Section '[{}]' has no validator", name),
        }

        for param in &self.params {
            param.validate(&ctx, mode, report)?;
        }
        Ok(())
    }
}

/// Reject every key of `block` the schema does not declare, in one error
fn check_declared(schema: &SectionSchema, block: &IniSection) -> Result<()> {
    let unknown: Vec<&str> = block
        .keys()
        .filter(|key| {
            schema.param(key).is_none_or(|param| {
                matches!(param.kind, ParamKind::AvailabilityZone { .. })
            })
        })
        .collect();

    match unknown.len() {
        0 => Ok(()),
        1 => Err(ConfigError::configuration(format!(
            "The configuration parameter '{}' is not allowed in the [{}] section",
            unknown[0],
            block.name()
        ))),
        _ => Err(ConfigError::configuration(format!(
            "The configuration parameters '{}' are not allowed in the [{}] section",
            unknown.join(","),
            block.name()
        ))),
    }
}
