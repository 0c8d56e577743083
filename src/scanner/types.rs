//! Core data model for chart scans.

use serde::{Deserialize, Serialize};

/// How much trust the pipeline places in a finding.
///
/// The variants are ordered so that comparisons work on the ordinal
/// (`Low < Medium < High`); the serialized form stays the lowercase string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Which detection strategy produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Extracted from `helm template` output.
    #[serde(rename = "rendered-manifest")]
    RenderedManifest,
    /// Collected from explicit `image` fields in chart YAML.
    #[serde(rename = "static-yaml")]
    StaticYaml,
    /// Matched by the heuristic text scan.
    #[serde(rename = "regex-scan")]
    RegexScan,
}

impl SourceKind {
    /// Stable detector name, used in log lines and error wrapping.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RenderedManifest => "rendered-manifest",
            Self::StaticYaml => "static-yaml",
            Self::RegexScan => "regex-scan",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single detected container image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFinding {
    /// The image reference string as captured by the detector.
    pub name: String,
    /// Trust level for this finding.
    pub confidence: Confidence,
    /// Detector that produced it.
    pub source: SourceKind,
    /// Originating file, when the detector reads files directly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// 1-based line number within `file` (regex detector only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

/// The deduplicated, confidence-filtered outcome of a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Findings, at most one per repository, sorted by repository key.
    pub images: Vec<ImageFinding>,
}

/// Options controlling a scan invocation.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// The chart reference handed to the templating tool. A local directory,
    /// a `.tgz` file, an HTTP(S) URL to a chart archive, or an OCI reference.
    pub chart_path: String,
    /// Helm `--set=…` / `--set-string=…` flags, passed through verbatim.
    pub values: Vec<String>,
    /// Helm `--values=…` flags, passed through verbatim.
    pub values_files: Vec<String>,
    /// Path to the helm binary; empty means `helm` from PATH.
    pub helm_bin: String,
    /// Suppress the automatic `helm dependency build` fallback.
    pub disable_helm_deps: bool,
    /// Build dependencies up front and fan out into local subcharts.
    pub include_optional_deps: bool,
    /// Drop findings below this confidence; `None` keeps everything.
    pub min_confidence: Option<Confidence>,
    /// Emit progress lines to the log sink.
    pub verbose: bool,
}

impl ScanOptions {
    /// The helm binary to invoke, defaulting to `helm`.
    pub fn helm_bin(&self) -> &str {
        if self.helm_bin.is_empty() {
            "helm"
        } else {
            &self.helm_bin
        }
    }
}
