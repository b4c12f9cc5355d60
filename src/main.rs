//! # `ClusterConf`
//!
//! `ClusterConf` reads a cluster configuration file (or the deployment
//! parameters of a running stack), validates it and converts it between the
//! two representations.
//!
//! ## Usage
//!
//! **Validate the default configuration file:**
//! ```sh
//! clusterconf
//! ```
//!
//! **Produce deployment parameters for a cluster template:**
//! ```sh
//! clusterconf --config cluster.ini --cluster-template prod --to-deployment
//! ```
//!
//! **Recover a configuration file from deployment parameters:**
//! ```sh
//! clusterconf --from-deployment params.json --to-config
//! ```
//!
//! See `clusterconf --help` for more options and details.

use anyhow::Result;
use clap::Parser as _;
use clusterconf::cli::Args;
use clusterconf::error::ConfigError;
use clusterconf::system::real::RealSystem;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> Result<()> {
    let args = Args::parse();

    // Keep stdout clean when it carries a document
    let log_level = if args.emits_document() {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let system = RealSystem::new();
    match clusterconf::run(&args, &system) {
        Ok(output) => {
            print!("{output}");
            std::process::exit(0)
        }
        Err(err) => {
            error!("{:#}", err);
            std::process::exit(
                err.downcast_ref::<ConfigError>()
                    .map_or(1, ConfigError::exit_code),
            );
        }
    }
}
