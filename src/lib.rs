pub mod cli;
pub mod error;
pub mod scanner;

use cli::{Commands, OutputFormat};

// Re-export commonly used types and functions
pub use error::{Result, ScanError};
pub use scanner::{
    normalize_image_name, scan, scan_with, split_repo_and_tag, Confidence, ImageFinding,
    ScanOptions, ScanResult, SourceKind,
};

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Scan {
            chart_ref,
            min_confidence,
            no_helm_deps,
            include_optional_deps,
            set,
            set_string,
            values,
            helm_bin,
            output,
        } => {
            let options = build_scan_options(
                chart_ref,
                min_confidence.into(),
                no_helm_deps,
                include_optional_deps,
                &set,
                &set_string,
                &values,
                helm_bin,
                log::log_enabled!(log::Level::Info),
            );

            let result = scanner::scan(options)?;

            let encoded = match output {
                OutputFormat::Yaml => serde_yaml::to_string(&result)?,
                OutputFormat::Json => serde_json::to_string_pretty(&result)?,
            };
            print!("{encoded}");
            if !encoded.ends_with('\n') {
                println!();
            }

            Ok(())
        }
    }
}

/// Assemble core scan options from CLI inputs, prefixing the Helm value
/// flags so the core can pass them through verbatim.
#[allow(clippy::too_many_arguments)]
fn build_scan_options(
    chart_ref: String,
    min_confidence: Confidence,
    no_helm_deps: bool,
    include_optional_deps: bool,
    set: &[String],
    set_string: &[String],
    values_files: &[String],
    helm_bin: Option<String>,
    verbose: bool,
) -> ScanOptions {
    let mut helm_values = Vec::new();
    for value in set {
        helm_values.push(format!("--set={value}"));
    }
    for value in set_string {
        helm_values.push(format!("--set-string={value}"));
    }

    let helm_values_files = values_files
        .iter()
        .map(|file| format!("--values={file}"))
        .collect();

    ScanOptions {
        chart_path: chart_ref,
        values: helm_values,
        values_files: helm_values_files,
        helm_bin: helm_bin.unwrap_or_default(),
        disable_helm_deps: no_helm_deps,
        include_optional_deps,
        min_confidence: Some(min_confidence),
        verbose,
    }
}
