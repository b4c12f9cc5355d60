use crate::cli::commands::Output;
use crate::validation::ValidationMode;
use clap::Parser;

/// Command-line arguments for clusterconf
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "clusterconf")]
#[command(
    about = "A CLI tool for converting cluster configuration files to and from provisioning template parameters"
)]
#[command(long_about = None)]
#[command(version)]
pub struct Args {
    /// Configuration file path [default: $AWS_PCLUSTER_CONFIG_FILE or ~/.parallelcluster/config]
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<String>,

    /// Cluster section label, overriding [global] cluster_template
    #[arg(long = "cluster-template", value_name = "LABEL")]
    pub cluster_template: Option<String>,

    /// Read the configuration from a deployment parameter document instead
    #[arg(
        long = "from-deployment",
        value_name = "PATH",
        conflicts_with_all = ["config", "cluster_template"]
    )]
    pub from_deployment: Option<String>,

    /// JSON lookup tables answering availability zone and mount target queries
    #[arg(long, value_name = "PATH")]
    pub lookups: Option<String>,

    /// Output the deployment parameters instead of validating only
    #[arg(long = "to-deployment", conflicts_with = "to_config")]
    pub to_deployment: bool,

    /// Output the configuration file form instead of validating only
    #[arg(long = "to-config", conflicts_with = "to_deployment")]
    pub to_config: bool,

    /// Write the output to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<String>,

    /// Report every validation error instead of stopping at the first
    #[arg(long = "collect-errors")]
    pub collect_errors: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// What the run produces
    #[must_use]
    pub const fn output_kind(&self) -> Output {
        if self.to_deployment {
            Output::Deployment
        } else if self.to_config {
            Output::Config
        } else {
            Output::Status
        }
    }

    /// Whether a document is printed on stdout
    #[must_use]
    pub const fn emits_document(&self) -> bool {
        self.output.is_none() && !matches!(self.output_kind(), Output::Status)
    }

    #[must_use]
    pub const fn validation_mode(&self) -> ValidationMode {
        if self.collect_errors {
            ValidationMode::Collect
        } else {
            ValidationMode::FailFast
        }
    }
}
