//! Chart materialization for remote references.
//!
//! Turns HTTP(S) tarball URLs and OCI registry references into a local chart
//! directory that the detectors can walk. Local paths pass through the
//! scanner untouched and never reach this module.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use tempfile::TempDir;

use crate::error::{Result, ScanError};
use crate::scanner::helm::ToolRunner;

/// Cap on how much of an HTTP error body is carried into the error message.
const MAX_ERROR_BODY: usize = 4096;

/// Whether a chart reference needs materialization before scanning.
pub fn is_remote_chart_ref(reference: &str) -> bool {
    reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with("oci://")
}

/// Fetch a remote chart reference and return the local chart root together
/// with the scratch directory that owns it. The scratch directory is removed
/// when the returned guard is dropped.
pub(crate) fn fetch_and_extract_chart(
    reference: &str,
    helm: &str,
    runner: &dyn ToolRunner,
) -> Result<(PathBuf, TempDir)> {
    materialize(reference, helm, runner).map_err(|err| match err {
        materialization @ ScanError::Materialization { .. } => materialization,
        other => ScanError::Materialization {
            reference: reference.to_string(),
            reason: other.to_string(),
        },
    })
}

fn materialize(reference: &str, helm: &str, runner: &dyn ToolRunner) -> Result<(PathBuf, TempDir)> {
    let scratch = tempfile::Builder::new().prefix("heft-chart-").tempdir()?;

    if reference.starts_with("http://") || reference.starts_with("https://") {
        let tgz_path = scratch.path().join("chart.tgz");
        download_file(reference, &tgz_path)?;
        let root = extract_tar_gz(&tgz_path, scratch.path())?;
        log::debug!("extracted {} to {}", reference, root.display());
        return Ok((root, scratch));
    }

    if reference.starts_with("oci://") {
        let untardir = scratch.path().to_string_lossy().into_owned();
        let args = vec![
            "pull".to_string(),
            reference.to_string(),
            "--untar".to_string(),
            "--untardir".to_string(),
            untardir,
        ];
        let output = runner.run(helm, &args)?;
        if !output.success {
            return Err(ScanError::Materialization {
                reference: reference.to_string(),
                reason: format!("helm pull failed: {}", output.stderr_string()),
            });
        }

        let mut subdirs: Vec<PathBuf> = fs::read_dir(scratch.path())?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        subdirs.sort();

        return match subdirs.into_iter().next() {
            Some(root) => Ok((root, scratch)),
            None => Err(ScanError::Materialization {
                reference: reference.to_string(),
                reason: "no chart directory found after helm pull".to_string(),
            }),
        };
    }

    Err(ScanError::Materialization {
        reference: reference.to_string(),
        reason: "unsupported remote chart ref".to_string(),
    })
}

fn download_file(url: &str, dest: &Path) -> Result<()> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let mut response = client.get(url).send()?;

    if response.status() != reqwest::StatusCode::OK {
        let status = response.status().as_u16();
        let body = response.bytes().unwrap_or_default();
        let snippet = String::from_utf8_lossy(&body[..body.len().min(MAX_ERROR_BODY)])
            .trim()
            .to_string();
        let reason = if snippet.is_empty() {
            format!("unexpected status {status} from {url}")
        } else {
            format!("unexpected status {status} from {url}: {snippet}")
        };
        return Err(ScanError::Materialization {
            reference: url.to_string(),
            reason,
        });
    }

    let mut file = File::create(dest)?;
    io::copy(&mut response, &mut file)?;
    Ok(())
}

/// Stream a gzipped tar archive into `dest_dir` and return the extracted
/// chart root.
///
/// Only directories and regular files are written; symlinks and other entry
/// types are ignored. Entry names lose a single leading `./`, and the root is
/// the first path segment of the first non-empty entry name.
pub(crate) fn extract_tar_gz(tgz_path: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let file = File::open(tgz_path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);

    let mut root: Option<PathBuf> = None;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let raw = entry.path()?.to_string_lossy().into_owned();
        let name = raw.strip_prefix("./").unwrap_or(&raw);
        if name.is_empty() {
            continue;
        }

        if root.is_none() {
            let first = name.split('/').next().unwrap_or(name);
            root = Some(dest_dir.join(first));
        }

        let target = dest_dir.join(name);
        match entry.header().entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(&target)?;
            }
            EntryType::Regular => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&target)?;
                io::copy(&mut entry, &mut out)?;
            }
            _ => {}
        }
    }

    root.ok_or(ScanError::EmptyArchive)
}
