//! Static-YAML detector.
//!
//! A best-effort pass over the chart's own YAML files for explicit `image`
//! fields, used when rendering is unavailable or incomplete. Values behind
//! Go-template expressions (`{{ … }}`) cannot be resolved statically and are
//! skipped.

use crate::error::{Result, ScanError};
use crate::scanner::split_yaml_documents;
use crate::scanner::types::{Confidence, ImageFinding, ScanOptions, SourceKind};

pub(crate) fn detect_static(options: &ScanOptions) -> Result<Vec<ImageFinding>> {
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

        let lower = entry.path().to_string_lossy().to_lowercase();
        if !(lower.ends_with(".yaml") || lower.ends_with(".yml")) {
            continue;
        }

        // Best-effort: unreadable files are skipped.
        let content = match std::fs::read_to_string(entry.path()) {
            Ok(content) => content,
            Err(_) => continue,
        };

        let file = entry.path().display().to_string();
        for document in split_yaml_documents(&content) {
            if document.trim().is_empty() {
                continue;
            }
            let value: serde_yaml::Value = match serde_yaml::from_str(&document) {
                Ok(value) => value,
                Err(_) => continue,
            };
            // Only mapping documents are inspected; a bare sequence or
            // scalar is not chart configuration.
            if value.is_mapping() {
                collect_static_images(&value, &file, &mut results);
            }
        }
    }

    Ok(results)
}

/// Recursively walk a YAML structure looking for `image` fields, either a
/// plain string or the common `{repository, tag}` mapping convention.
fn collect_static_images(node: &serde_yaml::Value, file: &str, results: &mut Vec<ImageFinding>) {
    match node {
        serde_yaml::Value::Mapping(mapping) => {
            if let Some(image_value) = node.get("image") {
                if let Some(name) = image_value.as_str() {
                    if !name.is_empty() && !name.contains("{{") {
                        results.push(static_finding(name.to_string(), file));
                    }
                }
                if image_value.is_mapping() {
                    let repository = image_value.get("repository").and_then(|r| r.as_str());
                    let tag = image_value.get("tag").and_then(|t| t.as_str());
                    if let Some(repository) = repository {
                        if !repository.is_empty() && !repository.contains("{{") {
                            let name = match tag {
                                Some(tag) if !tag.is_empty() && !tag.contains("{{") => {
                                    format!("{repository}:{tag}")
                                }
                                _ => repository.to_string(),
                            };
                            results.push(static_finding(name, file));
                        }
                    }
                }
            }
            for (_, child) in mapping {
                collect_static_images(child, file, results);
            }
        }
        serde_yaml::Value::Sequence(sequence) => {
            for item in sequence {
                collect_static_images(item, file, results);
            }
        }
        _ => {}
    }
}

fn static_finding(name: String, file: &str) -> ImageFinding {
    ImageFinding {
        name,
        confidence: Confidence::Medium,
        source: SourceKind::StaticYaml,
        file: Some(file.to_string()),
        line: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn detect_static_at(path: &Path) -> Result<Vec<ImageFinding>> {
        detect_static(&ScanOptions {
            chart_path: path.display().to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_empty_chart_path_is_an_error() {
        let err = detect_static(&ScanOptions::default()).unwrap_err();
        assert!(matches!(err, ScanError::EmptyChartPath));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let result = detect_static_at(Path::new("/nonexistent/heft-chart"));
        assert!(result.is_err());
    }

    #[test]
    fn test_collects_plain_image_strings() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("values.yaml"),
            "app:\n  image: ghcr.io/ex/app:v1\n",
        )
        .unwrap();

        let images = detect_static_at(dir.path()).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name, "ghcr.io/ex/app:v1");
        assert_eq!(images[0].confidence, Confidence::Medium);
        assert_eq!(images[0].source, SourceKind::StaticYaml);
        assert!(images[0].file.as_ref().unwrap().ends_with("values.yaml"));
        assert!(images[0].line.is_none());
    }

    #[test]
    fn test_collects_repository_tag_mapping() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("values.yaml"),
            "image:\n  repository: quay.io/org/app\n  tag: \"2.4\"\n",
        )
        .unwrap();

        let images = detect_static_at(dir.path()).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name, "quay.io/org/app:2.4");
    }

    #[test]
    fn test_repository_without_tag() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("values.yaml"),
            "image:\n  repository: quay.io/org/app\n",
        )
        .unwrap();

        let images = detect_static_at(dir.path()).unwrap();
        assert_eq!(images[0].name, "quay.io/org/app");
    }

    #[test]
    fn test_skips_templated_values() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("deployment.yaml"),
            concat!(
                "spec:\n",
                "  template:\n",
                "    spec:\n",
                "      containers:\n",
                "      - image: \"{{ .Values.image.repository }}:{{ .Values.image.tag }}\"\n",
            ),
        )
        .unwrap();
        fs::write(
            dir.path().join("values.yaml"),
            "image:\n  repository: \"{{ .Values.global.repo }}\"\n  tag: latest\n",
        )
        .unwrap();

        let images = detect_static_at(dir.path()).unwrap();
        assert!(images.is_empty());
    }

    #[test]
    fn test_templated_tag_is_dropped_but_repository_kept() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("values.yaml"),
            "image:\n  repository: quay.io/org/app\n  tag: \"{{ .Chart.AppVersion }}\"\n",
        )
        .unwrap();

        let images = detect_static_at(dir.path()).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name, "quay.io/org/app");
    }

    #[test]
    fn test_walks_nested_structures_and_multiple_documents() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("templates")).unwrap();
        fs::write(
            dir.path().join("templates/workloads.yml"),
            concat!(
                "kind: Deployment\n",
                "spec:\n",
                "  template:\n",
                "    spec:\n",
                "      containers:\n",
                "      - name: app\n",
                "        image: ghcr.io/ex/app:v1\n",
                "---\n",
                "kind: CronJob\n",
                "spec:\n",
                "  jobTemplate:\n",
                "    spec:\n",
                "      template:\n",
                "        spec:\n",
                "          containers:\n",
                "          - image: ghcr.io/ex/cron:v2\n",
            ),
        )
        .unwrap();

        let mut names: Vec<String> = detect_static_at(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["ghcr.io/ex/app:v1", "ghcr.io/ex/cron:v2"]);
    }

    #[test]
    fn test_unparsable_document_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("broken.yaml"),
            "image: [unclosed\n---\nimage: redis:6.0\n",
        )
        .unwrap();

        let images = detect_static_at(dir.path()).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name, "redis:6.0");
    }

    #[test]
    fn test_ignores_non_yaml_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("NOTES.txt"), "image: nginx:1.25\n").unwrap();

        let images = detect_static_at(dir.path()).unwrap();
        assert!(images.is_empty());
    }
}
