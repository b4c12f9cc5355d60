//! Configuration management module
//!
//! `ClusterConfig` is the in-memory tree: sections keyed by kind and label.
//! It is built from defaults, from the file form or from the deployment form,
//! and written back to either form.

pub mod deployment;
pub mod ini;
pub mod loader;
pub mod schema;

use crate::error::{ConfigError, Result};
use crate::oracle::Oracle;
use crate::param::value::ParamValue;
use crate::schema::Schema;
use crate::section::Section;
use crate::section::materialize::{Materializer, Presence, Source};
use crate::validation::{ValidationMode, ValidationReport};
use deployment::CfnParams;
use ini::IniDocument;
use std::collections::BTreeMap;
use tracing::debug;

const CLUSTER: &str = "cluster";
const GLOBAL: &str = "global";
const AWS: &str = "aws";
const VPC: &str = "vpc";
const CLUSTER_TEMPLATE: &str = "cluster_template";
const REGION_NAME: &str = "aws_region_name";
const MASTER_AZ: &str = "master_availability_zone";

/// Caller choices applied while reading the file form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Cluster section label, overriding `cluster_template`
    pub cluster_label: Option<String>,
    /// Region, overriding `aws_region_name`
    pub region: Option<String>,
}

/// A materialized configuration tree
#[derive(Debug, Clone)]
pub struct ClusterConfig<'s> {
    schema: &'s Schema,
    sections: BTreeMap<&'static str, BTreeMap<String, Section<'s>>>,
    cluster_label: String,
    region: Option<String>,
}

impl PartialEq for ClusterConfig<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cluster_label == other.cluster_label && self.sections == other.sections
    }
}

impl<'s> ClusterConfig<'s> {
    fn empty(schema: &'s Schema, region: Option<String>) -> Self {
        Self {
            schema,
            sections: BTreeMap::new(),
            cluster_label: String::new(),
            region,
        }
    }

    /// Tree holding only schema defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a default settings label is invalid.
    pub fn from_defaults(schema: &'s Schema, oracle: &dyn Oracle) -> Result<Self> {
        Self::build(schema, Source::Defaults, &BuildOptions::default(), oracle)
    }

    /// Tree read from the file form
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a missing required section, an
    /// undeclared key or a value that does not decode, and a lookup error
    /// when a subnet cannot be resolved.
    pub fn from_file(
        schema: &'s Schema,
        document: &IniDocument,
        options: &BuildOptions,
        oracle: &dyn Oracle,
    ) -> Result<Self> {
        Self::build(schema, Source::File(document), options, oracle)
    }

    fn build(
        schema: &'s Schema,
        source: Source<'_>,
        options: &BuildOptions,
        oracle: &dyn Oracle,
    ) -> Result<Self> {
        let mut m = Materializer::new(schema, oracle);
        let mut config = Self::empty(schema, options.region.clone());

        for section_schema in schema.main_sections() {
            let section = if section_schema.key == CLUSTER {
                let (label, presence) = config.cluster_choice(options);
                config.cluster_label.clone_from(&label);
                Section::materialize(&mut m, section_schema, Some(&label), source, presence)?
            } else {
                Section::materialize(&mut m, section_schema, None, source, Presence::Optional)?
            };
            config.add_section(section);
            for referred in m.take_referred() {
                config.add_section(referred);
            }
        }

        Ok(config)
    }

    /// Label of the cluster section and whether its block must exist
    fn cluster_choice(&self, options: &BuildOptions) -> (String, Presence) {
        if let Some(label) = &options.cluster_label {
            return (label.clone(), Presence::Required);
        }
        let template = self
            .get_section(GLOBAL)
            .and_then(|global| global.param(CLUSTER_TEMPLATE));
        match template {
            Some(param) if !param.is_default() => (
                param.value().text().unwrap_or_default(),
                Presence::Required,
            ),
            Some(param) => (param.value().text().unwrap_or_default(), Presence::Optional),
            None => ("default".to_owned(), Presence::Optional),
        }
    }

    /// Tree read from the deployment form
    ///
    /// The cluster section and everything it refers to come from `cfn`; the
    /// other top-level sections hold defaults, with `cluster_template` naming
    /// the decoded cluster label.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a slot does not decode.
    pub fn from_deployment(schema: &'s Schema, cfn: &CfnParams, oracle: &dyn Oracle) -> Result<Self> {
        let mut m = Materializer::new(schema, oracle);
        let mut config = Self::empty(schema, None);

        let cluster_schema = schema.section(CLUSTER)?;
        let cluster = Section::materialize(
            &mut m,
            cluster_schema,
            None,
            Source::Deployment(cfn),
            Presence::Optional,
        )?;
        let referred = m.take_referred();
        config.cluster_label = cluster.label().to_owned();

        for section_schema in schema.main_sections().filter(|s| s.key != CLUSTER) {
            let mut section =
                Section::materialize(&mut m, section_schema, None, Source::Defaults, Presence::Optional)?;
            if section.key() == GLOBAL {
                section.set_value(CLUSTER_TEMPLATE, ParamValue::String(config.cluster_label.clone()))?;
            }
            config.add_section(section);
            for extra in m.take_referred() {
                config.add_section(extra);
            }
        }

        config.add_section(cluster);
        for section in referred {
            config.add_section(section);
        }
        debug!("Decoded cluster '{}' from {} deployment parameters", config.cluster_label, cfn.len());
        Ok(config)
    }

    /// Override the region when one is given
    #[must_use]
    pub fn with_region(mut self, region: Option<String>) -> Self {
        if region.is_some() {
            self.region = region;
        }
        self
    }

    #[must_use]
    pub const fn schema(&self) -> &'s Schema {
        self.schema
    }

    #[must_use]
    pub fn cluster_label(&self) -> &str {
        &self.cluster_label
    }

    /// Insert a section, replacing any with the same kind and label
    pub fn add_section(&mut self, section: Section<'s>) {
        self.sections
            .entry(section.key())
            .or_default()
            .insert(section.label().to_owned(), section);
    }

    #[must_use]
    pub fn section(&self, kind: &str, label: &str) -> Option<&Section<'s>> {
        self.sections.get(kind).and_then(|by_label| by_label.get(label))
    }

    #[must_use]
    pub fn section_mut(&mut self, kind: &str, label: &str) -> Option<&mut Section<'s>> {
        self.sections
            .get_mut(kind)
            .and_then(|by_label| by_label.get_mut(label))
    }

    /// First section of a kind, in label order
    #[must_use]
    pub fn get_section(&self, kind: &str) -> Option<&Section<'s>> {
        self.sections
            .get(kind)
            .and_then(|by_label| by_label.values().next())
    }

    /// All sections of a kind, in label order
    pub fn sections_of(&self, kind: &str) -> impl Iterator<Item = &Section<'s>> {
        self.sections.get(kind).into_iter().flat_map(BTreeMap::values)
    }

    #[must_use]
    pub fn has_sections(&self, kind: &str) -> bool {
        self.sections
            .get(kind)
            .is_some_and(|by_label| !by_label.is_empty())
    }

    /// The selected cluster section
    #[must_use]
    pub fn cluster_section(&self) -> Option<&Section<'s>> {
        self.section(CLUSTER, &self.cluster_label)
    }

    /// Availability zone of the master subnet, when known
    #[must_use]
    pub fn master_availability_zone(&self) -> Option<&str> {
        let cluster = self.cluster_section();
        let vpc = cluster
            .and_then(|c| c.value("vpc_settings"))
            .and_then(ParamValue::as_str)
            .and_then(|label| self.section(VPC, label))
            .or_else(|| self.get_section(VPC))?;
        vpc.value(MASTER_AZ).and_then(ParamValue::as_str)
    }

    /// Region override, else `aws_region_name`
    #[must_use]
    pub fn region(&self) -> &str {
        if let Some(region) = self.region.as_deref() {
            return region;
        }
        self.get_section(AWS)
            .and_then(|aws| aws.value(REGION_NAME))
            .and_then(ParamValue::as_str)
            .unwrap_or("us-east-1")
    }

    /// Run every section and parameter validator
    ///
    /// Sections are visited in declaration order of their kinds.
    ///
    /// # Errors
    ///
    /// In fail-fast mode returns the first validation error.
    pub fn validate(&self, oracle: &dyn Oracle, mode: ValidationMode) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();
        for kind in self.schema.sections() {
            for section in self.sections_of(kind.key) {
                section.validate(self, oracle, mode, &mut report)?;
            }
        }
        Ok(report)
    }

    /// The file form of the tree; only values differing from defaults are written
    #[must_use]
    pub fn to_file(&self) -> IniDocument {
        let mut document = IniDocument::new();
        for kind in self.schema.main_sections() {
            if kind.key == CLUSTER {
                if let Some(cluster) = self.cluster_section() {
                    cluster.to_file(self, &mut document);
                }
            } else {
                for section in self.sections_of(kind.key) {
                    section.to_file(self, &mut document);
                }
            }
        }
        document
    }

    /// The deployment form of the cluster section and everything it refers to
    ///
    /// # Errors
    ///
    /// Returns a configuration error when there is no cluster section and
    /// propagates lookup failures.
    pub fn to_cfn(&self, oracle: &dyn Oracle) -> Result<CfnParams> {
        let cluster = self.cluster_section().ok_or_else(|| {
            ConfigError::configuration(format!(
                "Section '[cluster {}]' is missing from the configuration",
                self.cluster_label
            ))
        })?;
        let mut out = CfnParams::new();
        cluster.to_cfn(self, oracle, &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;
    use crate::oracle::StaticOracle;

    #[test]
    fn defaults_materialize_the_default_scaling_section() {
        let oracle = StaticOracle::new();
        let config = ClusterConfig::from_defaults(Schema::global(), &oracle).unwrap();

        assert_eq!(config.cluster_label(), "default");
        assert!(config.section("scaling", "default").is_some());
        assert!(!config.has_sections("vpc"));
        assert!(!config.has_sections("ebs"));
        assert_eq!(config.region(), "us-east-1");
        assert!(config.to_file().is_empty());
    }

    #[test]
    fn region_override_wins() {
        let oracle = StaticOracle::new();
        let document = IniDocument::parse("[aws]\naws_region_name = eu-west-1\n").unwrap();
        let config = ClusterConfig::from_file(
            Schema::global(),
            &document,
            &BuildOptions::default(),
            &oracle,
        )
        .unwrap();
        assert_eq!(config.region(), "eu-west-1");

        let options = BuildOptions {
            region: Some("ap-south-1".to_owned()),
            ..BuildOptions::default()
        };
        let config = ClusterConfig::from_file(Schema::global(), &document, &options, &oracle).unwrap();
        assert_eq!(config.region(), "ap-south-1");
    }

    #[test]
    fn explicit_cluster_label_requires_the_block() {
        let oracle = StaticOracle::new();
        let document = IniDocument::parse("[global]\nsanity_check = false\n").unwrap();
        let options = BuildOptions {
            cluster_label: Some("prod".to_owned()),
            ..BuildOptions::default()
        };
        let err = ClusterConfig::from_file(Schema::global(), &document, &options, &oracle)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Section '[cluster prod]' not found in the config file."
        );
    }
}
