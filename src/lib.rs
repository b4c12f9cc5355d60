//! `ClusterConf` - Schema-driven conversion of cluster configurations
//!
//! A cluster configuration exists in two shapes: the sectioned file users
//! edit and the flat parameter mapping a provisioning template consumes. This
//! library materializes either shape into one typed tree, validates it and
//! writes it back out in either shape.

pub mod cli;
pub mod config;
pub mod error;
pub mod oracle;
pub mod param;
pub mod schema;
pub mod section;
pub mod system;
pub mod validation;

use anyhow::Result;
use cli::Args;
use system::System;

/// Main entry point for the clusterconf library
///
/// Returns the text to print on stdout, empty when the output went to a file.
///
/// # Errors
///
/// Returns an error if loading, building, validating or writing fails; the
/// chain carries a `ConfigError` naming the failure kind.
pub fn run(args: &Args, system: &dyn System) -> Result<String> {
    cli::execute(args, system)
}
