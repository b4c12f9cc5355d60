//! Locating, reading and writing the documents the tool works with

use crate::config::deployment::CfnParams;
use crate::config::ini::IniDocument;
use crate::error::ConfigError;
use crate::oracle::StaticOracle;
use crate::system::System;
use anyhow::{Context as _, Result, anyhow};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable naming the configuration file
pub const CONFIG_FILE_ENV: &str = "AWS_PCLUSTER_CONFIG_FILE";

/// Configuration file location relative to the home directory
pub const DEFAULT_CONFIG_FILE: &str = ".parallelcluster/config";

/// Where the configuration file is looked up, and whether it must exist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    pub path: PathBuf,
    /// Named by the user rather than the built-in default
    pub explicit: bool,
}

/// Resolve the configuration file: explicit path, then environment, then home
///
/// # Errors
///
/// Returns an error if no path is given and the home directory is unknown.
pub fn resolve_config_path(system: &dyn System, explicit: Option<&str>) -> Result<ConfigLocation> {
    if let Some(path) = explicit {
        return Ok(ConfigLocation {
            path: PathBuf::from(path),
            explicit: true,
        });
    }

    if let Ok(path) = system.env_var(CONFIG_FILE_ENV)
        && !path.trim().is_empty()
    {
        return Ok(ConfigLocation {
            path: PathBuf::from(path.trim()),
            explicit: true,
        });
    }

    let home = system.home_dir().ok_or_else(|| {
        anyhow!("Unable to determine the home directory; pass the configuration file with --config")
    })?;
    Ok(ConfigLocation {
        path: home.join(DEFAULT_CONFIG_FILE),
        explicit: false,
    })
}

/// Read and parse the configuration file
///
/// A missing file is an error only when its location was explicit; otherwise
/// the empty document stands in for it.
///
/// # Errors
///
/// Returns a filesystem error if the file is missing or unreadable and a
/// configuration error if it does not parse.
pub fn load_document(system: &dyn System, location: &ConfigLocation) -> Result<IniDocument> {
    let path = location.path.as_path();
    if !system.exists(path) {
        if location.explicit {
            return Err(ConfigError::filesystem(format!(
                "Configuration file {} not found",
                path.display()
            ))
            .into());
        }
        info!(
            "Configuration file {} not found, using default values",
            path.display()
        );
        return Ok(IniDocument::new());
    }

    let content = read(system, path, "configuration file")?;
    IniDocument::parse(&content)
        .with_context(|| format!("Failed to parse configuration file: {}", path.display()))
}

/// Read a deployment parameter document
///
/// # Errors
///
/// Returns a filesystem error if the file cannot be read and a configuration
/// error if it is malformed.
pub fn load_deployment(system: &dyn System, path: &Path) -> Result<CfnParams> {
    let content = read(system, path, "deployment parameters")?;
    CfnParams::from_json(&content)
        .with_context(|| format!("Failed to load deployment parameters: {}", path.display()))
}

/// Read lookup tables for the static oracle
///
/// # Errors
///
/// Returns a filesystem error if the file cannot be read and a configuration
/// error if it is malformed.
pub fn load_lookups(system: &dyn System, path: &Path) -> Result<StaticOracle> {
    let content = read(system, path, "lookup tables")?;
    StaticOracle::from_json(&content)
        .with_context(|| format!("Failed to load lookup tables: {}", path.display()))
}

/// Write a document, creating parent directories
///
/// # Errors
///
/// Returns a filesystem error if the file cannot be written.
pub fn write_document(system: &dyn System, path: &Path, content: &str) -> Result<()> {
    system.write(path, content.as_bytes()).map_err(|e| {
        ConfigError::filesystem(format!("Failed to write {}: {e}", path.display())).into()
    })
}

fn read(system: &dyn System, path: &Path, what: &str) -> Result<String> {
    system.read_to_string(path).map_err(|e| {
        ConfigError::filesystem(format!("Failed to read {what} {}: {e}", path.display())).into()
    })
}
