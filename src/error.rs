//! Error types for chart scanning
//!
//! One enum covers the whole pipeline: fatal materialization and
//! dependency-build failures, per-detector failures (recorded as warnings
//! by the orchestrator), and the terminal empty-result case.

use thiserror::Error;

/// Errors produced while scanning a chart for container images
#[derive(Debug, Error)]
pub enum ScanError {
    /// Fetching or unpacking a remote chart reference failed
    #[error("failed to fetch remote chart {reference:?}: {reason}")]
    Materialization {
        /// The chart reference as given by the caller
        reference: String,
        /// What went wrong (download, extraction, or OCI pull)
        reason: String,
    },

    /// The up-front `helm dependency build` for optional dependencies failed
    #[error("helm dependency build failed for {chart:?}: {stderr}")]
    DependencyBuild {
        /// Chart directory the build ran against
        chart: String,
        /// Captured stderr of the failed build
        stderr: String,
    },

    /// A single detector failed; the scan continues with the remaining ones
    #[error("{detector} detector failed: {source}")]
    Detector {
        /// Name of the failing detector
        detector: &'static str,
        #[source]
        source: Box<ScanError>,
    },

    /// `helm template` exited non-zero and no fallback recovered it
    #[error("helm template failed: {stderr}")]
    Template {
        /// Captured stderr of the failed render
        stderr: String,
    },

    /// Every detector ran and none produced a finding
    #[error("no images found by any detector")]
    NoImages,

    /// A detector was handed an empty chart path
    #[error("chart path is empty")]
    EmptyChartPath,

    /// A chart archive contained no entries to derive a root directory from
    #[error("no root directory found in chart archive")]
    EmptyArchive,

    /// HTTP transport failure while downloading a chart
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Result serialization failure
    #[error("encode result: {0}")]
    Encode(#[from] serde_yaml::Error),

    /// Result serialization failure (JSON output)
    #[error("encode result: {0}")]
    EncodeJson(#[from] serde_json::Error),

    /// Filesystem or subprocess I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, ScanError>;
