//! Settings parameters: labels of referred sections
//!
//! A single settings parameter names one section of another kind. A
//! multi-instance one names up to `max` of them; in the deployment form those
//! instances are spread over positional comma lists plus a count slot.

use super::value::{ParamValue, SENTINEL, is_absent, split_list};
use super::{Origin, Param};
use crate::config::ClusterConfig;
use crate::config::deployment::CfnParams;
use crate::config::ini::IniDocument;
use crate::error::{ConfigError, Result};
use crate::oracle::Oracle;
use crate::schema::ParamSchema;
use crate::section::materialize::{Materializer, Presence, Source};
use crate::section::Section;
use tracing::debug;

pub fn materialize_single<'s>(
    m: &mut Materializer<'s, '_>,
    schema: &'s ParamSchema,
    kind: &'static str,
    origin: Origin<'_>,
) -> Result<Param<'s>> {
    let referred = m.schema().section(kind)?;

    match origin {
        Origin::File { document, section } => {
            let label = section.get(schema.key).map(str::trim).unwrap_or_default();
            if label.is_empty() {
                return default_single(m, schema, kind);
            }
            if label.contains(',') {
                return Err(ConfigError::configuration(format!(
                    "The value of '{}' parameter is invalid. It can only contains a single {} section label.",
                    schema.key, kind
                )));
            }
            let section = Section::materialize(
                m,
                referred,
                Some(label),
                Source::File(document),
                Presence::Required,
            )?;
            m.refer(section);
            Ok(Param::new(schema, ParamValue::string(label)))
        }
        Origin::Deployment(cfn) => {
            let label = schema
                .default
                .as_str()
                .or(referred.label)
                .unwrap_or("default")
                .to_owned();
            let section = Section::materialize(
                m,
                referred,
                Some(&label),
                Source::Deployment(cfn),
                Presence::Optional,
            )?;
            if schema.default.is_none() && section.is_default() {
                debug!("No values for [{}] in the deployment parameters", section.file_name());
                return Ok(Param::new(schema, ParamValue::None));
            }
            m.refer(section);
            Ok(Param::new(schema, ParamValue::String(label)))
        }
        Origin::Default | Origin::Slot(_) => default_single(m, schema, kind),
    }
}

/// Schema default, materializing the default-labelled section if there is one
fn default_single<'s>(
    m: &mut Materializer<'s, '_>,
    schema: &'s ParamSchema,
    kind: &'static str,
) -> Result<Param<'s>> {
    if let Some(label) = schema.default.as_str() {
        if label.contains(',') {
            return Err(ConfigError::configuration(format!(
                "The default value of '{}' parameter is invalid. It can only contains a single {} section label.",
                schema.key, kind
            )));
        }
        let referred = m.schema().section(kind)?;
        let section =
            Section::materialize(m, referred, Some(label), Source::Defaults, Presence::Optional)?;
        m.refer(section);
    }
    Ok(Param::with_default(schema))
}

pub fn materialize_multi<'s>(
    m: &mut Materializer<'s, '_>,
    schema: &'s ParamSchema,
    kind: &'static str,
    max: usize,
    count_slot: &'static str,
    origin: Origin<'_>,
) -> Result<Param<'s>> {
    let referred = m.schema().section(kind)?;

    match origin {
        Origin::File { document, section } => {
            let text = section.get(schema.key).map(str::trim).unwrap_or_default();
            if text.is_empty() {
                return Ok(Param::with_default(schema));
            }
            let labels = split_list(text);
            if labels.iter().any(String::is_empty) {
                return Err(ConfigError::configuration(format!(
                    "The value of '{}' parameter is invalid. It contains an empty {} section label.",
                    schema.key, kind
                )));
            }
            if let Some(label) = labels
                .iter()
                .enumerate()
                .find_map(|(i, label)| labels[..i].contains(label).then_some(label))
            {
                return Err(ConfigError::configuration(format!(
                    "The value of '{}' parameter is invalid. The {} section label '{}' is repeated.",
                    schema.key, kind, label
                )));
            }
            if labels.len() > max {
                return Err(ConfigError::configuration(format!(
                    "The value of '{}' parameter is invalid. It can only contains up to {} {} section labels.",
                    schema.key, max, kind
                )));
            }
            for label in &labels {
                let section = Section::materialize(
                    m,
                    referred,
                    Some(label),
                    Source::File(document),
                    Presence::Required,
                )?;
                m.refer(section);
            }
            Ok(Param::new(schema, ParamValue::List(labels)))
        }
        Origin::Deployment(cfn) => {
            let count = instance_count(cfn, count_slot, max)?;
            let mut labels = Vec::with_capacity(count);
            for index in 0..count {
                let label = format!("{kind}{}", index + 1);
                let section = Section::materialize(
                    m,
                    referred,
                    Some(&label),
                    Source::DeploymentIndexed(cfn, index),
                    Presence::Optional,
                )?;
                if section.is_default() {
                    debug!("Skipping [{}], all of its values are defaults", section.file_name());
                    continue;
                }
                m.refer(section);
                labels.push(label);
            }
            let value = if labels.is_empty() {
                schema.default.clone()
            } else {
                ParamValue::List(labels)
            };
            Ok(Param::new(schema, value))
        }
        Origin::Default | Origin::Slot(_) => Ok(Param::with_default(schema)),
    }
}

fn instance_count(cfn: &CfnParams, count_slot: &str, max: usize) -> Result<usize> {
    let text = cfn.get(count_slot).trim();
    if is_absent(text) {
        return Ok(0);
    }
    let count = text.parse::<usize>().map_err(|_| {
        ConfigError::configuration(format!(
            "Deployment slot '{count_slot}' must be a non-negative integer, got '{text}'"
        ))
    })?;
    if count > max {
        return Err(ConfigError::configuration(format!(
            "Deployment slot '{count_slot}' is {count}, at most {max} sections are supported"
        )));
    }
    Ok(count)
}

/// Item `index` of a per-instance slot; slots without a comma carry no instances
#[must_use]
pub fn indexed_item(text: &str, index: usize) -> &str {
    if !text.contains(',') {
        return SENTINEL;
    }
    text.split(',').nth(index).map_or(SENTINEL, str::trim)
}

pub fn single_file_entry(
    param: &Param<'_>,
    kind: &str,
    config: &ClusterConfig<'_>,
) -> Option<String> {
    let label = param.value().as_str()?;
    config
        .section(kind, label)
        .filter(|section| section.has_file_entries(config))
        .map(|_| label.to_owned())
}

pub fn multi_file_entry(
    param: &Param<'_>,
    kind: &str,
    config: &ClusterConfig<'_>,
) -> Option<String> {
    let labels: Vec<&str> = param
        .value()
        .as_list()?
        .iter()
        .filter(|label| {
            config
                .section(kind, label)
                .is_some_and(|section| section.has_file_entries(config))
        })
        .map(String::as_str)
        .collect();
    if labels.is_empty() {
        None
    } else {
        Some(labels.join(","))
    }
}

/// Write every section the parameter refers to; multi-instance sections in label order
pub fn write_referred(param: &Param<'_>, config: &ClusterConfig<'_>, document: &mut IniDocument) {
    let Some(kind) = param.schema().referred_section() else {
        return;
    };
    let mut labels: Vec<&str> = match param.value() {
        ParamValue::String(label) => vec![label.as_str()],
        ParamValue::List(labels) => labels.iter().map(String::as_str).collect(),
        _ => Vec::new(),
    };
    labels.sort_unstable();
    labels.dedup();
    for label in labels {
        if let Some(section) = config.section(kind, label) {
            section.to_file(config, document);
        }
    }
}

pub fn single_to_cfn(
    param: &Param<'_>,
    kind: &str,
    config: &ClusterConfig<'_>,
    oracle: &dyn Oracle,
    out: &mut CfnParams,
) -> Result<()> {
    let referred = config.schema().section(kind)?;
    match param.value().as_str().and_then(|label| config.section(kind, label)) {
        Some(section) => section.to_cfn(config, oracle, out),
        None => {
            let blank = Section::blank(referred, referred.label.unwrap_or_default());
            blank.to_cfn(config, oracle, out)
        }
    }
}

pub fn multi_to_cfn(
    param: &Param<'_>,
    kind: &str,
    max: usize,
    count_slot: &str,
    config: &ClusterConfig<'_>,
    out: &mut CfnParams,
) -> Result<()> {
    let referred = config.schema().section(kind)?;
    let mut sections: Vec<&Section<'_>> = param
        .value()
        .as_list()
        .unwrap_or_default()
        .iter()
        .filter_map(|label| config.section(kind, label))
        .collect();
    sections.sort_by(|a, b| a.label().cmp(b.label()));
    sections.dedup_by(|a, b| a.label() == b.label());
    if sections.len() > max {
        return Err(ConfigError::configuration(format!(
            "The value of '{}' parameter is invalid. It can only contains up to {} {} section labels.",
            param.key(),
            max,
            kind
        )));
    }

    let count = sections.len();
    for schema in &referred.params {
        let Some(slot) = schema.cfn else {
            continue;
        };
        if count == 0 && config.schema().slot_deferred_to(kind, slot) {
            continue;
        }
        let padding = schema.default.slot_text();
        let mut items: Vec<String> = sections
            .iter()
            .map(|section| {
                section
                    .param(schema.key)
                    .map_or_else(|| padding.clone(), Param::slot_text)
            })
            .collect();
        items.resize(max, padding);
        out.insert(slot, items.join(","));
    }
    out.insert(count_slot, count.max(1).to_string());
    Ok(())
}
