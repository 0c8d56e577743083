//! Scan orchestration.
//!
//! Detectors run in confidence order and degrade gracefully: a failing
//! detector becomes a warning, and the scan only fails outright when no
//! detector produced any image (or a materialization / dependency-build
//! step failed up front).

use std::io::{self, Write};

use tempfile::TempDir;

use crate::error::{Result, ScanError};
use crate::scanner::dedupe::dedupe_images;
use crate::scanner::helm::{SystemRunner, ToolRunner};
use crate::scanner::optional::{build_optional_dependencies, scan_optional_subcharts};
use crate::scanner::regex_scan::detect_regex;
use crate::scanner::remote::{fetch_and_extract_chart, is_remote_chart_ref};
use crate::scanner::rendered::detect_rendered;
use crate::scanner::static_yaml::detect_static;
use crate::scanner::types::{ImageFinding, ScanOptions, ScanResult};

/// Common signature every detector is adapted to.
pub(crate) type Detector =
    fn(&ScanOptions, &dyn ToolRunner, &mut dyn Write) -> Result<Vec<ImageFinding>>;

fn run_static(
    options: &ScanOptions,
    _runner: &dyn ToolRunner,
    _log: &mut dyn Write,
) -> Result<Vec<ImageFinding>> {
    detect_static(options)
}

fn run_regex(
    options: &ScanOptions,
    _runner: &dyn ToolRunner,
    _log: &mut dyn Write,
) -> Result<Vec<ImageFinding>> {
    detect_regex(options)
}

/// Detectors in decreasing order of confidence.
pub(crate) const DETECTORS: [(&str, Detector); 3] = [
    ("rendered-manifest", detect_rendered as Detector),
    ("static-yaml", run_static as Detector),
    ("regex-scan", run_regex as Detector),
];

/// Scan a chart with the system helm binary, logging to stderr.
pub fn scan(options: ScanOptions) -> Result<ScanResult> {
    let runner = SystemRunner;
    let mut log = io::stderr();
    scan_with(options, &runner, &mut log)
}

/// Scan a chart with an injected subprocess runner and log sink.
///
/// Remote chart references are materialized into a scratch directory first
/// and `chart_path` is rewritten to the local root; the scratch directory is
/// removed when the scan returns.
pub fn scan_with(
    mut options: ScanOptions,
    runner: &dyn ToolRunner,
    log: &mut dyn Write,
) -> Result<ScanResult> {
    log::info!("scanning chart: {}", options.chart_path);

    if options.verbose {
        let _ = writeln!(
            log,
            "heft: scan: chart={:?} includeOptionalDeps={}",
            options.chart_path, options.include_optional_deps
        );
    }

    // Holds the scratch directory (if any) for the duration of the scan.
    let _scratch: Option<TempDir> = if is_remote_chart_ref(&options.chart_path) {
        let (root, guard) = fetch_and_extract_chart(&options.chart_path, options.helm_bin(), runner)?;
        options.chart_path = root.display().to_string();
        Some(guard)
    } else {
        None
    };

    if options.include_optional_deps {
        build_optional_dependencies(&options, runner)?;
    }

    let mut all: Vec<ImageFinding> = Vec::new();
    let mut warnings: Vec<ScanError> = Vec::new();

    for (name, detector) in DETECTORS {
        match run_detector(name, &options, runner, log, detector) {
            Ok(images) => all.extend(images),
            Err(warning) => warnings.push(warning),
        }

        // Subchart fan-out complements the parent render the same way an
        // explicit `heft scan ./charts/<name>` per subchart would.
        if name == "rendered-manifest" && options.include_optional_deps {
            all.extend(scan_optional_subcharts(&options, runner, log));
        }
    }

    finalize_scan_result(all, warnings, &options, log)
}

fn run_detector(
    name: &'static str,
    options: &ScanOptions,
    runner: &dyn ToolRunner,
    log: &mut dyn Write,
    detector: Detector,
) -> Result<Vec<ImageFinding>> {
    match detector(options, runner, log) {
        Ok(images) => {
            if options.verbose {
                let _ = writeln!(
                    log,
                    "heft: {name}: chart={:?} images={}",
                    options.chart_path,
                    images.len()
                );
            }
            Ok(images)
        }
        Err(err) => {
            if options.verbose {
                let _ = writeln!(log, "heft: {name}: chart={:?} error={err}", options.chart_path);
            }
            Err(ScanError::Detector {
                detector: name,
                source: Box::new(err),
            })
        }
    }
}

fn finalize_scan_result(
    all: Vec<ImageFinding>,
    mut warnings: Vec<ScanError>,
    options: &ScanOptions,
    log: &mut dyn Write,
) -> Result<ScanResult> {
    if all.is_empty() {
        if !warnings.is_empty() {
            return Err(warnings.remove(0));
        }
        return Err(ScanError::NoImages);
    }

    // Findings exist, so failures downgrade to warnings on the log sink.
    for warning in &warnings {
        let _ = writeln!(log, "heft: warning: {warning}");
    }

    let mut images = dedupe_images(all);
    if let Some(min) = options.min_confidence {
        images.retain(|finding| finding.confidence >= min);
    }

    Ok(ScanResult { images })
}
