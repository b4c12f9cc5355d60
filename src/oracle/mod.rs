//! Lookups answered outside the conversion engine
//!
//! Resolving a subnet's availability zone or finding a file system's mount
//! target requires the cloud provider. The engine only consumes the answers
//! through the `Oracle` trait, so tests and offline runs can supply them.

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Answers to the provider lookups the engine needs
pub trait Oracle {
    /// Availability zone hosting the given subnet
    ///
    /// # Errors
    ///
    /// Returns a lookup error if the subnet is unknown.
    fn availability_zone(&self, subnet_id: &str) -> Result<String>;

    /// Mount target of the file system in the given zone, if there is one
    ///
    /// # Errors
    ///
    /// Returns a lookup error if the file system cannot be inspected.
    fn efs_mount_target(&self, efs_fs_id: &str, availability_zone: &str)
    -> Result<Option<String>>;
}

/// Oracle backed by fixed tables
///
/// # Example
/// ```
/// use clusterconf::oracle::{Oracle, StaticOracle};
///
/// let oracle = StaticOracle::new()
///     .with_availability_zone("subnet-12345678", "us-east-1a")
///     .with_mount_target("fs-12345678", "us-east-1a", "fsmt-1");
///
/// assert_eq!(oracle.availability_zone("subnet-12345678").unwrap(), "us-east-1a");
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StaticOracle {
    /// subnet id -> availability zone
    availability_zones: HashMap<String, String>,
    /// file system id -> availability zone -> mount target id
    mount_targets: HashMap<String, HashMap<String, String>>,
}

impl StaticOracle {
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the tables from a JSON document
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON of the expected shape.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            ConfigError::configuration(format!("Failed to parse lookup tables: {e}"))
        })
    }

    #[must_use]
    pub fn with_availability_zone(mut self, subnet_id: &str, availability_zone: &str) -> Self {
        self.availability_zones
            .insert(subnet_id.to_owned(), availability_zone.to_owned());
        self
    }

    #[must_use]
    pub fn with_mount_target(
        mut self,
        efs_fs_id: &str,
        availability_zone: &str,
        mount_target_id: &str,
    ) -> Self {
        self.mount_targets
            .entry(efs_fs_id.to_owned())
            .or_default()
            .insert(availability_zone.to_owned(), mount_target_id.to_owned());
        self
    }
}

impl Oracle for StaticOracle {
    fn availability_zone(&self, subnet_id: &str) -> Result<String> {
        self.availability_zones
            .get(subnet_id)
            .cloned()
            .ok_or_else(|| {
                ConfigError::lookup(format!(
                    "Unable to determine the availability zone of subnet '{subnet_id}'"
                ))
            })
    }

    fn efs_mount_target(
        &self,
        efs_fs_id: &str,
        availability_zone: &str,
    ) -> Result<Option<String>> {
        Ok(self
            .mount_targets
            .get(efs_fs_id)
            .and_then(|zones| zones.get(availability_zone))
            .cloned())
    }
}
