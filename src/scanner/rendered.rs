//! Rendered-manifest detector.
//!
//! Invokes `helm template` and pulls container images out of the workload
//! objects in the rendered YAML. This is the highest-confidence detector:
//! the templating tool has already resolved values, conditionals, and
//! helpers, so whatever appears in an `image` field is what the cluster
//! would pull.

use std::io::Write;

use crate::error::{Result, ScanError};
use crate::scanner::helm::ToolRunner;
use crate::scanner::remote::is_remote_chart_ref;
use crate::scanner::split_yaml_documents;
use crate::scanner::types::{Confidence, ImageFinding, ScanOptions, SourceKind};

/// Release name passed to `helm template`; it only needs to be stable.
const RELEASE_NAME: &str = "heft-scan";

/// Workload kinds whose pod spec lives at `spec.template.spec`.
const TEMPLATED_KINDS: [&str; 7] = [
    "Deployment",
    "StatefulSet",
    "DaemonSet",
    "Job",
    "CronJob",
    "ReplicaSet",
    "ReplicationController",
];

pub(crate) fn detect_rendered(
    options: &ScanOptions,
    runner: &dyn ToolRunner,
    log: &mut dyn Write,
) -> Result<Vec<ImageFinding>> {
    let helm = options.helm_bin();

    let template_args = build_template_args(options);

    let template = |log: &mut dyn Write| -> Result<String> {
        if options.verbose {
            let _ = writeln!(
                log,
                "heft: rendered-manifest: {} {}",
                helm,
                template_args.join(" ")
            );
        }

        let output = runner.run(helm, &template_args)?;
        if !output.success {
            let stderr = output.stderr_string();
            if options.verbose {
                let _ = writeln!(log, "heft: rendered-manifest: helm error: {stderr}");
            }
            return Err(ScanError::Template { stderr });
        }
        Ok(output.stdout_string())
    };

    let rendered = match template(log) {
        Ok(stdout) => stdout,
        Err(err) => {
            // If auto dependency builds are disabled, just surface the error.
            if options.disable_helm_deps {
                return Err(err);
            }

            // A missing-dependency failure on a local chart gets one
            // best-effort `helm dependency build` followed by a single retry.
            let looks_like_missing_deps = match &err {
                ScanError::Template { stderr } => {
                    !is_remote_chart_ref(&options.chart_path)
                        && (stderr.contains("helm dependency build")
                            || stderr.contains("missing in charts/ directory"))
                }
                _ => false,
            };
            if !looks_like_missing_deps {
                return Err(err);
            }

            let build_args = vec![
                "dependency".to_string(),
                "build".to_string(),
                options.chart_path.clone(),
            ];
            let built = runner
                .run(helm, &build_args)
                .map(|output| output.success)
                .unwrap_or(false);

            if built {
                match template(log) {
                    Ok(stdout) => stdout,
                    Err(_) => return Err(err),
                }
            } else {
                return Err(err);
            }
        }
    };

    Ok(collect_rendered_images(&rendered))
}

fn build_template_args(options: &ScanOptions) -> Vec<String> {
    let mut args = vec!["template".to_string(), RELEASE_NAME.to_string()];
    args.extend(options.values_files.iter().cloned());
    args.extend(options.values.iter().cloned());
    args.push(options.chart_path.clone());
    args
}

/// Parse rendered YAML documents and collect workload container images.
///
/// Documents that fail to parse are skipped; an empty render is simply an
/// empty result, not an error.
fn collect_rendered_images(rendered: &str) -> Vec<ImageFinding> {
    let mut images = Vec::new();

    for document in split_yaml_documents(rendered) {
        if document.trim().is_empty() {
            continue;
        }

        let value: serde_yaml::Value = match serde_yaml::from_str(&document) {
            Ok(value) => value,
            Err(_) => continue,
        };

        let kind = match value.get("kind").and_then(|k| k.as_str()) {
            Some(kind) if !kind.is_empty() => kind,
            _ => continue,
        };

        let spec = value.get("spec");
        let pod_spec = if TEMPLATED_KINDS.contains(&kind) {
            spec.and_then(|s| s.get("template")).and_then(|t| t.get("spec"))
        } else if kind == "Pod" {
            spec
        } else {
            None
        };

        let pod_spec = match pod_spec {
            Some(pod_spec) => pod_spec,
            None => continue,
        };

        for list in ["containers", "initContainers", "ephemeralContainers"] {
            collect_container_images(pod_spec.get(list), &mut images);
        }
    }

    images
}

fn collect_container_images(containers: Option<&serde_yaml::Value>, images: &mut Vec<ImageFinding>) {
    let Some(sequence) = containers.and_then(|c| c.as_sequence()) else {
        return;
    };

    for container in sequence {
        if let Some(image) = container.get("image").and_then(|i| i.as_str()) {
            if !image.is_empty() {
                images.push(ImageFinding {
                    name: image.to_string(),
                    confidence: Confidence::High,
                    source: SourceKind::RenderedManifest,
                    file: None,
                    line: None,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::helm::ToolOutput;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Records invocations and replays a scripted sequence of outputs.
    struct FakeHelm {
        responses: Mutex<VecDeque<ToolOutput>>,
        invocations: Mutex<Vec<Vec<String>>>,
    }

    impl FakeHelm {
        fn new(responses: Vec<ToolOutput>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                invocations: Mutex::new(Vec::new()),
            }
        }

        fn invocations(&self) -> Vec<Vec<String>> {
            self.invocations.lock().unwrap().clone()
        }
    }

    impl ToolRunner for FakeHelm {
        fn run(&self, _program: &str, args: &[String]) -> std::io::Result<ToolOutput> {
            self.invocations.lock().unwrap().push(args.to_vec());
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra helm invocation"))
        }
    }

    fn ok(stdout: &str) -> ToolOutput {
        ToolOutput {
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
            success: true,
        }
    }

    fn fail(stderr: &str) -> ToolOutput {
        ToolOutput {
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
            success: false,
        }
    }

    fn options(chart: &str) -> ScanOptions {
        ScanOptions {
            chart_path: chart.to_string(),
            ..Default::default()
        }
    }

    const DEPLOYMENT: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: app
spec:
  template:
    spec:
      initContainers:
      - name: migrate
        image: ghcr.io/ex/migrate:0.4.0
      containers:
      - name: app
        image: ghcr.io/ex/app:v1.2.1
      - name: sidecar
        image: ""
"#;

    const POD_AND_SERVICE: &str = r#"
apiVersion: v1
kind: Service
metadata:
  name: svc
spec:
  ports:
  - port: 80
---
apiVersion: v1
kind: Pod
metadata:
  name: debug
spec:
  containers:
  - name: shell
    image: busybox:1.36
  ephemeralContainers:
  - name: probe
    image: ghcr.io/ex/probe:0.1.0
"#;

    #[test]
    fn test_collects_images_from_workloads() {
        let runner = FakeHelm::new(vec![ok(DEPLOYMENT)]);
        let mut log = Vec::new();

        let images = detect_rendered(&options("./chart"), &runner, &mut log).unwrap();
        let names: Vec<&str> = images.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["ghcr.io/ex/app:v1.2.1", "ghcr.io/ex/migrate:0.4.0"]);
        assert!(images
            .iter()
            .all(|f| f.confidence == Confidence::High && f.source == SourceKind::RenderedManifest));
        assert!(images.iter().all(|f| f.file.is_none() && f.line.is_none()));
    }

    #[test]
    fn test_pod_spec_is_read_directly_for_pods() {
        let runner = FakeHelm::new(vec![ok(POD_AND_SERVICE)]);
        let mut log = Vec::new();

        let images = detect_rendered(&options("./chart"), &runner, &mut log).unwrap();
        let names: Vec<&str> = images.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["busybox:1.36", "ghcr.io/ex/probe:0.1.0"]);
    }

    #[test]
    fn test_template_args_shape() {
        let runner = FakeHelm::new(vec![ok("")]);
        let mut log = Vec::new();
        let opts = ScanOptions {
            chart_path: "./chart".to_string(),
            values: vec!["--set=a.b=1".to_string(), "--set-string=c=x".to_string()],
            values_files: vec!["--values=custom.yaml".to_string()],
            ..Default::default()
        };

        detect_rendered(&opts, &runner, &mut log).unwrap();

        let invocations = runner.invocations();
        assert_eq!(
            invocations[0],
            vec![
                "template",
                "heft-scan",
                "--values=custom.yaml",
                "--set=a.b=1",
                "--set-string=c=x",
                "./chart",
            ]
        );
    }

    #[test]
    fn test_empty_render_is_not_an_error() {
        let runner = FakeHelm::new(vec![ok("")]);
        let mut log = Vec::new();

        let images = detect_rendered(&options("./chart"), &runner, &mut log).unwrap();
        assert!(images.is_empty());
    }

    #[test]
    fn test_unparsable_document_is_skipped() {
        let rendered = format!("foo: [unclosed\n---{DEPLOYMENT}");
        let runner = FakeHelm::new(vec![ok(&rendered)]);
        let mut log = Vec::new();

        let images = detect_rendered(&options("./chart"), &runner, &mut log).unwrap();
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn test_failure_with_deps_disabled_is_surfaced() {
        let runner = FakeHelm::new(vec![fail("Error: missing in charts/ directory")]);
        let mut log = Vec::new();
        let opts = ScanOptions {
            chart_path: "./chart".to_string(),
            disable_helm_deps: true,
            ..Default::default()
        };

        let err = detect_rendered(&opts, &runner, &mut log).unwrap_err();
        assert!(matches!(err, ScanError::Template { .. }));
        assert_eq!(runner.invocations().len(), 1);
    }

    #[test]
    fn test_dependency_build_fallback_retries_once() {
        let runner = FakeHelm::new(vec![
            fail("Error: found in Chart.yaml, but missing in charts/ directory"),
            ok(""),
            ok(DEPLOYMENT),
        ]);
        let mut log = Vec::new();

        let images = detect_rendered(&options("./chart"), &runner, &mut log).unwrap();
        assert_eq!(images.len(), 2);

        // Two identical template invocations sandwiching a dependency build.
        let invocations = runner.invocations();
        assert_eq!(invocations.len(), 3);
        assert_eq!(invocations[0][0], "template");
        assert_eq!(invocations[1], vec!["dependency", "build", "./chart"]);
        assert_eq!(invocations[2], invocations[0]);
    }

    #[test]
    fn test_fallback_skipped_for_remote_chart_refs() {
        let runner = FakeHelm::new(vec![fail("Error: missing in charts/ directory")]);
        let mut log = Vec::new();
        let opts = options("oci://ghcr.io/org/chart");

        let err = detect_rendered(&opts, &runner, &mut log).unwrap_err();
        assert!(matches!(err, ScanError::Template { .. }));
        assert_eq!(runner.invocations().len(), 1);
    }

    #[test]
    fn test_failed_dependency_build_returns_original_error() {
        let runner = FakeHelm::new(vec![
            fail("Error: missing in charts/ directory"),
            fail("Error: no repository definition"),
        ]);
        let mut log = Vec::new();

        let err = detect_rendered(&options("./chart"), &runner, &mut log).unwrap_err();
        match err {
            ScanError::Template { stderr } => {
                assert!(stderr.contains("missing in charts/ directory"))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(runner.invocations().len(), 2);
    }

    #[test]
    fn test_unrelated_failure_is_not_retried() {
        let runner = FakeHelm::new(vec![fail("Error: parse error in deployment.yaml")]);
        let mut log = Vec::new();

        let err = detect_rendered(&options("./chart"), &runner, &mut log).unwrap_err();
        assert!(matches!(err, ScanError::Template { .. }));
        assert_eq!(runner.invocations().len(), 1);
    }
}
