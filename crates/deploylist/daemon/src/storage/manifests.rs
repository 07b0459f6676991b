//! Loading declared objects from YAML manifests

use crate::error::{DaemonError, DaemonResult};
use deploylist_types::ListGithubDeployments;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Read every `ListGithubDeployments` object from `paths`
///
/// A path may be a file or a directory; directories contribute their
/// `*.yaml` and `*.yml` files in name order (not recursively). A file may
/// hold several `---` separated documents. Documents of another kind are
/// skipped.
pub async fn load_manifests(paths: &[PathBuf]) -> DaemonResult<Vec<ListGithubDeployments>> {
    let mut objects = Vec::new();
    for path in paths {
        for file in manifest_files(path).await? {
            let text = tokio::fs::read_to_string(&file).await?;
            objects.extend(parse_manifest(&file, &text)?);
        }
    }
    Ok(objects)
}

async fn manifest_files(path: &Path) -> DaemonResult<Vec<PathBuf>> {
    if !tokio::fs::metadata(path).await?.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let file = entry.path();
        let is_yaml = matches!(
            file.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml && entry.file_type().await?.is_file() {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}

fn parse_manifest(path: &Path, text: &str) -> DaemonResult<Vec<ListGithubDeployments>> {
    let invalid = |e: serde_yaml::Error| DaemonError::Manifest {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let kind = ListGithubDeployments::object_kind();

    let mut objects = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = serde_yaml::Value::deserialize(document).map_err(invalid)?;
        if value.is_null() {
            continue;
        }

        let object: ListGithubDeployments = serde_yaml::from_value(value).map_err(invalid)?;
        if !kind.matches(&object.api_version, &object.kind) {
            tracing::warn!(
                path = %path.display(),
                api_version = %object.api_version,
                kind = %object.kind,
                "Skipping object of unexpected kind"
            );
            continue;
        }
        objects.push(object);
    }
    Ok(objects)
}
