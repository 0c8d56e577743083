//! Regex detector.
//!
//! The last line of defense: scan every chart file line by line for
//! image-shaped substrings. Matches are low confidence by construction and
//! lean on the deduplicator to yield to anything the other detectors found.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, ScanError};
use crate::scanner::types::{Confidence, ImageFinding, ScanOptions, SourceKind};

/// Conservative image-reference shape:
/// `[registry[:port]/]name[/…][:tag | @sha256:<64 hex>]`.
static IMAGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?:[a-z0-9](?:[a-z0-9.-]*[a-z0-9])?(?::[0-9]+)?/)?",
        r"[a-z0-9]+(?:[._-][a-z0-9]+)*",
        r"(?:/[a-z0-9]+(?:[._-][a-z0-9]+)*)*",
        r"(?::\w[\w.-]{0,127}|@sha256:[A-Fa-f0-9]{64})?",
    ))
    .expect("image pattern compiles")
});

pub(crate) fn detect_regex(options: &ScanOptions) -> Result<Vec<ImageFinding>> {
    let root = &options.chart_path;
    if root.is_empty() {
        return Err(ScanError::EmptyChartPath);
    }

    let mut results = Vec::new();

    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.path().is_file() {
            continue;
        }

        // Test fixtures and unit-test snapshots are full of sample image
        // strings; skip them wholesale to reduce noise.
        let lower_path = entry.path().to_string_lossy().to_lowercase();
        if lower_path.contains("/tests/") || lower_path.contains("__snapshot__") {
            continue;
        }

        let data = match std::fs::read(entry.path()) {
            Ok(data) => data,
            Err(_) => continue,
        };
        let content = String::from_utf8_lossy(&data);

        let file = entry.path().display().to_string();
        for (index, line) in content.lines().enumerate() {
            for m in IMAGE_PATTERN.find_iter(line) {
                let candidate = m.as_str();
                if !looks_like_image(candidate) {
                    continue;
                }
                results.push(ImageFinding {
                    name: candidate.to_string(),
                    confidence: Confidence::Low,
                    source: SourceKind::RegexScan,
                    file: Some(file.clone()),
                    line: Some(index + 1),
                });
            }
        }
    }

    Ok(results)
}

/// Suppress the matches the pattern alone cannot rule out: bare words with
/// neither a path nor a tag, and templating residue like `foo:.` / `foo=.`.
fn looks_like_image(candidate: &str) -> bool {
    if candidate.ends_with("=.") || candidate.ends_with(":.") {
        return false;
    }
    candidate.contains('/') || candidate.contains(':')
}
