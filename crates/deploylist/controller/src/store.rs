//! Storage of declared objects and their status

use async_trait::async_trait;
use deploylist_types::{ListGithubDeployments, ObjectKey, SpecValidationError};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write based on a stale resource version
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Object rejected by validation
    #[error("Invalid object: {0}")]
    Invalid(#[from] SpecValidationError),

    /// Backing medium failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for `ListGithubDeployments` objects
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Get an object by key
    async fn get(&self, key: &ObjectKey) -> StoreResult<Option<ListGithubDeployments>>;

    /// List all objects, ordered by key
    async fn list(&self) -> StoreResult<Vec<ListGithubDeployments>>;

    /// Create or update an object's spec
    ///
    /// The key and spec are validated first. The submitted status is ignored. The generation is bumped when the
    /// spec changes.
    async fn apply(&self, object: ListGithubDeployments) -> StoreResult<ListGithubDeployments>;

    /// Delete an object by key
    async fn delete(&self, key: &ObjectKey) -> StoreResult<bool>;

    /// Replace the status of an object
    ///
    /// Fails with [`StoreError::Conflict`] when the object changed since it
    /// was read.
    async fn update_status(&self, object: &ListGithubDeployments)
        -> StoreResult<ListGithubDeployments>;
}

/// In-memory object storage
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<BTreeMap<ObjectKey, ListGithubDeployments>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, key: &ObjectKey) -> StoreResult<Option<ListGithubDeployments>> {
        let objects = self.objects.read().await;
        Ok(objects.get(key).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<ListGithubDeployments>> {
        let objects = self.objects.read().await;
        Ok(objects.values().cloned().collect())
    }

    async fn apply(&self, mut object: ListGithubDeployments) -> StoreResult<ListGithubDeployments> {
        object.validate()?;

        let mut objects = self.objects.write().await;
        let key = object.key();

        let stored = match objects.get(&key) {
            Some(existing) => {
                let mut updated = existing.clone();
                if updated.spec != object.spec {
                    updated.spec = object.spec;
                    updated.metadata.generation += 1;
                }
                updated.metadata.resource_version += 1;
                updated
            }
            None => {
                object.metadata.generation = 1;
                object.metadata.resource_version = 1;
                object.status = Default::default();
                object
            }
        };

        objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, key: &ObjectKey) -> StoreResult<bool> {
        let mut objects = self.objects.write().await;
        Ok(objects.remove(key).is_some())
    }

    async fn update_status(
        &self,
        object: &ListGithubDeployments,
    ) -> StoreResult<ListGithubDeployments> {
        let mut objects = self.objects.write().await;
        let key = object.key();

        let existing = objects
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        if existing.metadata.resource_version != object.metadata.resource_version {
            return Err(StoreError::Conflict(format!(
                "{} was modified (resource version {} != {})",
                key, existing.metadata.resource_version, object.metadata.resource_version
            )));
        }

        existing.status = object.status.clone();
        existing.metadata.resource_version += 1;
        Ok(existing.clone())
    }
}
