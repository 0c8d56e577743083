use clap::{Parser, Subcommand, ValueEnum};

use crate::scanner::Confidence;

#[derive(Parser)]
#[command(name = "heft")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scan Helm charts for container images")]
#[command(
    long_about = "Scans a Helm chart for the container images it will cause a cluster to pull, \
using rendered manifests, static chart YAML, and a heuristic text scan, in decreasing order of \
confidence. Accepts local chart directories, chart tarballs, HTTP(S) tarball URLs, and OCI \
registry references."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a Helm chart for container images
    Scan {
        /// Chart reference: directory, .tgz file, HTTP(S) URL, or oci:// ref
        #[arg(value_name = "CHART_REF")]
        chart_ref: String,

        /// Minimum image confidence to include
        #[arg(long, value_enum, default_value = "low")]
        min_confidence: ConfidenceArg,

        /// Disable automatic `helm dependency build`
        #[arg(long)]
        no_helm_deps: bool,

        /// Include optional chart dependencies when scanning
        #[arg(long)]
        include_optional_deps: bool,

        /// Set Helm values (key=val, repeatable)
        #[arg(long, value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Set Helm string values (key=val, repeatable)
        #[arg(long, value_name = "KEY=VALUE")]
        set_string: Vec<String>,

        /// Values file (repeatable)
        #[arg(short = 'f', long = "values", value_name = "FILE")]
        values: Vec<String>,

        /// Path to the helm binary
        #[arg(long, value_name = "PATH")]
        helm_bin: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfidenceArg {
    Low,
    Medium,
    High,
}

impl From<ConfidenceArg> for Confidence {
    fn from(arg: ConfidenceArg) -> Self {
        match arg {
            ConfidenceArg::Low => Confidence::Low,
            ConfidenceArg::Medium => Confidence::Medium,
            ConfidenceArg::High => Confidence::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}
