//! Object store decorator mirroring status to disk

use async_trait::async_trait;
use deploylist_controller::{ObjectStore, StoreResult};
use deploylist_types::{ListDeploymentsStatus, ListGithubDeployments, ObjectKey};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Wraps an [`ObjectStore`] and writes every status update to
/// `<dir>/<namespace>/<name>.json`
///
/// When an object is first applied and a mirrored status exists, that status
/// is restored so records survive daemon restarts.
///
/// The inner store is authoritative. A status update that reaches the inner
/// store counts as persisted even when the mirror write fails; the failure
/// is logged and the next update rewrites the file.
pub struct FileStatusStore {
    inner: Arc<dyn ObjectStore>,
    dir: PathBuf,
}

impl FileStatusStore {
    pub fn new(inner: Arc<dyn ObjectStore>, dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            dir: dir.into(),
        }
    }

    /// Path of the status file for `key`
    ///
    /// Fails for keys that are not DNS labels, so the path always stays
    /// under the mirror directory.
    pub fn status_path(&self, key: &ObjectKey) -> StoreResult<PathBuf> {
        key.validate()?;
        Ok(self
            .dir
            .join(&key.namespace)
            .join(format!("{}.json", key.name)))
    }

    /// Read a mirrored status, if one exists
    pub async fn read_status(&self, key: &ObjectKey) -> StoreResult<Option<ListDeploymentsStatus>> {
        match tokio::fs::read(self.status_path(key)?).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_status(&self, object: &ListGithubDeployments) -> StoreResult<()> {
        let path = self.status_path(&object.key())?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write-then-rename so readers never see a partial file
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&object.status)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FileStatusStore {
    async fn get(&self, key: &ObjectKey) -> StoreResult<Option<ListGithubDeployments>> {
        self.inner.get(key).await
    }

    async fn list(&self) -> StoreResult<Vec<ListGithubDeployments>> {
        self.inner.list().await
    }

    async fn apply(&self, object: ListGithubDeployments) -> StoreResult<ListGithubDeployments> {
        let applied = self.inner.apply(object).await?;
        if applied.metadata.resource_version != 1 {
            return Ok(applied);
        }

        match self.read_status(&applied.key()).await {
            Ok(Some(status)) => {
                tracing::info!(object = %applied.key(), "Restored mirrored status");
                let mut restored = applied;
                restored.status = status;
                self.inner.update_status(&restored).await
            }
            Ok(None) => Ok(applied),
            Err(e) => {
                tracing::warn!(object = %applied.key(), error = %e, "Ignoring unreadable mirrored status");
                Ok(applied)
            }
        }
    }

    async fn delete(&self, key: &ObjectKey) -> StoreResult<bool> {
        let deleted = self.inner.delete(key).await?;
        if !deleted {
            return Ok(false);
        }

        match tokio::fs::remove_file(self.status_path(key)?).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(object = %key, error = %e, "Failed to remove mirrored status");
            }
        }
        Ok(deleted)
    }

    async fn update_status(
        &self,
        object: &ListGithubDeployments,
    ) -> StoreResult<ListGithubDeployments> {
        let updated = self.inner.update_status(object).await?;
        if let Err(e) = self.write_status(&updated).await {
            tracing::warn!(object = %updated.key(), error = %e, "Failed to mirror status");
        }
        Ok(updated)
    }
}
