//! Helm chart image scanning.
//!
//! Extracts the set of container images a chart would cause a cluster to
//! pull, using three detectors in decreasing order of confidence:
//!
//! 1. **rendered-manifest**: `helm template` output parsed for workload
//!    pod specs (high confidence).
//! 2. **static-yaml**: explicit `image` fields in the chart's own YAML
//!    (medium confidence).
//! 3. **regex-scan**: heuristic text matching across all chart files
//!    (low confidence).
//!
//! Findings are deduplicated per repository (higher confidence wins, tagged
//! references beat untagged ones) and filtered by a minimum confidence.
//! Remote chart references (HTTP(S) tarballs and `oci://`) are fetched into
//! a scratch directory first.
//!
//! # Example
//!
//! ```rust,ignore
//! use heft::scanner::{scan, Confidence, ScanOptions};
//!
//! let result = scan(ScanOptions {
//!     chart_path: "./my-chart".to_string(),
//!     min_confidence: Some(Confidence::Medium),
//!     ..Default::default()
//! })?;
//!
//! for image in result.images {
//!     println!("{} ({})", image.name, image.confidence);
//! }
//! ```

pub mod dedupe;
pub mod helm;
pub mod optional;
pub mod regex_scan;
pub mod remote;
pub mod rendered;
pub mod scan;
pub mod static_yaml;
pub mod types;

pub use dedupe::{dedupe_images, normalize_image_name, split_repo_and_tag};
pub use helm::{SystemRunner, ToolOutput, ToolRunner};
pub use remote::is_remote_chart_ref;
pub use scan::{scan, scan_with};
pub use types::{Confidence, ImageFinding, ScanOptions, ScanResult, SourceKind};

/// Split a YAML stream on document separator lines (`---`).
///
/// Line-based on purpose: a `---` inside a quoted scalar must not split the
/// document the way a byte-level split would.
pub(crate) fn split_yaml_documents(input: &str) -> Vec<String> {
    let mut documents = Vec::new();
    let mut current = String::new();

    for line in input.lines() {
        if line.trim_end() == "---" {
            documents.push(std::mem::take(&mut current));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    documents.push(current);

    documents
}
