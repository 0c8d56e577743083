//! Optional-dependency handling.
//!
//! When `include_optional_deps` is set, dependencies are materialized up
//! front with `helm dependency build`, and after the rendered detector runs
//! on the root chart every subchart under `charts/` gets the full detector
//! triple. This surfaces images from subcharts the parent chart does not
//! enable by default.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScanError};
use crate::scanner::helm::ToolRunner;
use crate::scanner::scan::DETECTORS;
use crate::scanner::types::{ImageFinding, ScanOptions};

/// Run `helm dependency build` against the chart. Failure is fatal to the
/// scan, unlike detector errors.
pub(crate) fn build_optional_dependencies(
    options: &ScanOptions,
    runner: &dyn ToolRunner,
) -> Result<()> {
    let args = vec![
        "dependency".to_string(),
        "build".to_string(),
        options.chart_path.clone(),
    ];
    let output = runner.run(options.helm_bin(), &args)?;
    if !output.success {
        return Err(ScanError::DependencyBuild {
            chart: options.chart_path.clone(),
            stderr: output.stderr_string(),
        });
    }
    Ok(())
}

/// Run all detectors against each subchart directory under `charts/`.
///
/// A missing `charts/` directory is not an error, and per-detector failures
/// are dropped (logged when verbose): subchart findings are opportunistic.
pub(crate) fn scan_optional_subcharts(
    options: &ScanOptions,
    runner: &dyn ToolRunner,
    log: &mut dyn Write,
) -> Vec<ImageFinding> {
    let charts_dir = Path::new(&options.chart_path).join("charts");
    let entries = match fs::read_dir(&charts_dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut subcharts: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    subcharts.sort();

    let mut all = Vec::new();

    for subchart in subcharts {
        let mut sub_options = options.clone();
        sub_options.chart_path = subchart.display().to_string();

        if options.verbose {
            let _ = writeln!(log, "heft: scan: subchart={:?}", sub_options.chart_path);
        }

        for (name, detector) in DETECTORS {
            match detector(&sub_options, runner, log) {
                Ok(images) => {
                    if options.verbose {
                        let _ = writeln!(
                            log,
                            "heft: {name}: chart={:?} images={}",
                            sub_options.chart_path,
                            images.len()
                        );
                    }
                    all.extend(images);
                }
                Err(err) => {
                    if options.verbose {
                        let _ = writeln!(
                            log,
                            "heft: {name}: chart={:?} error={err}",
                            sub_options.chart_path
                        );
                    }
                }
            }
        }
    }

    all
}
