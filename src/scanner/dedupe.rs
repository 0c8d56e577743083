//! Image reference splitting, normalization, and cross-detector dedup.

use std::collections::BTreeMap;

use crate::scanner::types::ImageFinding;

/// Split an image reference into its repository key and whether it carries a
/// tag or digest.
///
/// A digest (`@`) always wins. Otherwise the last `:` is a tag separator only
/// when a `/` appears before it, which keeps registry host ports intact:
/// `registry:5000/ns/app:v1` splits to `registry:5000/ns/app`.
pub fn split_repo_and_tag(name: &str) -> (&str, bool) {
    if let Some(at) = name.find('@') {
        return (&name[..at], true);
    }

    if let (Some(last_colon), Some(first_slash)) = (name.rfind(':'), name.find('/')) {
        if last_colon > first_slash {
            return (&name[..last_colon], true);
        }
    }

    (name, false)
}

/// Normalize an image name so the registry host is explicit and a tag is
/// present when omitted.
///
/// Names whose first path segment contains a `.` are treated as fully
/// qualified and returned unchanged. Everything else is assumed to target
/// Docker Hub: `nginx` becomes `docker.io/library/nginx:latest`,
/// `grafana/loki` becomes `docker.io/grafana/loki:latest`.
pub fn normalize_image_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return String::new();
    }

    let mut base_for_host = name;
    if let Some(at) = base_for_host.find('@') {
        base_for_host = &base_for_host[..at];
    }
    if let Some(colon) = base_for_host.find(':') {
        base_for_host = &base_for_host[..colon];
    }

    let first = match base_for_host.find('/') {
        Some(slash) => &base_for_host[..slash],
        None => base_for_host,
    };

    if first.contains('.') {
        return name.to_string();
    }

    let needs_tag = !name.contains(':') && !name.contains('@');
    let base = if needs_tag {
        format!("{name}:latest")
    } else {
        name.to_string()
    };

    if base_for_host.contains('/') {
        format!("docker.io/{base}")
    } else {
        format!("docker.io/library/{base}")
    }
}

/// Collapse findings so at most one survives per repository key.
///
/// Findings are visited in input order. A higher-confidence finding replaces
/// a lower-confidence one; at equal confidence a tagged reference beats an
/// untagged one, and otherwise the first finding wins. The output is sorted
/// by repository key so it is independent of detector interleaving.
pub fn dedupe_images(images: Vec<ImageFinding>) -> Vec<ImageFinding> {
    let mut seen: BTreeMap<String, ImageFinding> = BTreeMap::new();

    for image in images {
        let (repo, has_tag) = split_repo_and_tag(&image.name);
        let repo = repo.to_string();

        if let Some(existing) = seen.get(&repo) {
            if existing.confidence != image.confidence {
                if existing.confidence > image.confidence {
                    continue;
                }
            } else {
                let (_, existing_has_tag) = split_repo_and_tag(&existing.name);
                if existing_has_tag || !has_tag {
                    continue;
                }
            }
        }

        seen.insert(repo, image);
    }

    seen.into_values().collect()
}
