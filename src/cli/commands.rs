//! CLI command implementations

use crate::cli::Args;
use crate::config::deployment::CfnParams;
use crate::config::loader::{
    load_deployment, load_document, load_lookups, resolve_config_path, write_document,
};
use crate::config::{BuildOptions, ClusterConfig};
use crate::error::ConfigError;
use crate::oracle::StaticOracle;
use crate::schema::Schema;
use crate::system::System;
use anyhow::{Context as _, Result};
use std::path::Path;
use tracing::info;

/// Environment variable overriding the configured region
pub const REGION_ENV: &str = "AWS_DEFAULT_REGION";

/// What a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// Validation outcome only
    Status,
    /// Deployment parameters as JSON
    Deployment,
    /// Configuration file form
    Config,
}

/// Build the tree the arguments describe, validate it and render the output
///
/// # Errors
///
/// Returns an error if the inputs cannot be loaded, the tree cannot be
/// built, validation fails or the output cannot be written.
pub fn execute(args: &Args, system: &dyn System) -> Result<String> {
    let oracle = match args.lookups.as_deref() {
        Some(path) => load_lookups(system, Path::new(path))?,
        None => StaticOracle::new(),
    };
    let schema = Schema::global();
    let region = system
        .env_var(REGION_ENV)
        .ok()
        .filter(|region| !region.trim().is_empty());

    let config = match args.from_deployment.as_deref() {
        Some(path) => {
            let cfn: CfnParams = load_deployment(system, Path::new(path))?;
            ClusterConfig::from_deployment(schema, &cfn, &oracle)?.with_region(region)
        }
        None => {
            let location = resolve_config_path(system, args.config.as_deref())?;
            let document = load_document(system, &location)?;
            let options = BuildOptions {
                cluster_label: args.cluster_template.clone(),
                region,
            };
            ClusterConfig::from_file(schema, &document, &options, &oracle).with_context(|| {
                format!("Invalid configuration in {}", location.path.display())
            })?
        }
    };

    let report = config.validate(&oracle, args.validation_mode())?;
    if !report.is_valid() {
        return Err(ConfigError::validation(format!(
            "Configuration is not valid, {} error(s) found",
            report.errors.len()
        ))
        .into());
    }
    info!(
        "Cluster '{}' validated with {} warning(s)",
        config.cluster_label(),
        report.warnings.len()
    );

    let rendered = match args.output_kind() {
        Output::Status => "Configuration is valid\n".to_owned(),
        Output::Deployment => {
            let mut json = config.to_cfn(&oracle)?.to_json()?;
            json.push('\n');
            json
        }
        Output::Config => config.to_file().render(),
    };

    match args.output.as_deref() {
        Some(path) => {
            write_document(system, Path::new(path), &rendered)?;
            info!("Output written to {}", path);
            Ok(String::new())
        }
        None => Ok(rendered),
    }
}
