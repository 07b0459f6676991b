//! Reconciliation of a single `ListGithubDeployments` object
//!
//! One pass loads the object, resolves its credential, pages through the
//! remote listing, orders and sanitizes the records, and writes them back
//! together with a `Ready` condition. The caller schedules the next pass
//! after the returned delay.

use crate::credentials::CredentialResolver;
use crate::error::{ReconcileError, ReconcileResult};
use crate::listing::ListerFactory;
use crate::ordering::order_records;
use crate::pagination::fetch_all;
use crate::sanitize::Sanitizer;
use crate::store::ObjectStore;
use deploylist_types::{Condition, Filter, ListGithubDeployments, ObjectKey, ObjectKind};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Drives declared objects towards their observed deployment listing
pub struct Reconciler {
    kind: ObjectKind,
    store: Arc<dyn ObjectStore>,
    credentials: Arc<dyn CredentialResolver>,
    listers: Arc<dyn ListerFactory>,
    sanitizer: Sanitizer,
}

impl Reconciler {
    pub fn new(
        kind: ObjectKind,
        store: Arc<dyn ObjectStore>,
        credentials: Arc<dyn CredentialResolver>,
        listers: Arc<dyn ListerFactory>,
    ) -> Self {
        Self {
            kind,
            store,
            credentials,
            listers,
            sanitizer: Sanitizer::default(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Run one pass for the object at `key`
    ///
    /// Returns the delay until the next pass, or `None` when the object no
    /// longer exists. Refresh failures are recorded on the object and do not
    /// surface here; only storage failures, kind mismatches and cancellation
    /// are returned as errors.
    pub async fn reconcile(
        &self,
        key: &ObjectKey,
        cancel: &CancellationToken,
    ) -> ReconcileResult<Option<Duration>> {
        let Some(mut object) = self.store.get(key).await.map_err(ReconcileError::Load)? else {
            tracing::debug!(object = %key, "Object not found, nothing to reconcile");
            return Ok(None);
        };

        if !self.kind.matches(&object.api_version, &object.kind) {
            return Err(ReconcileError::KindMismatch {
                api_version: object.api_version,
                kind: object.kind,
            });
        }

        self.reconcile_object(&mut object, cancel).await.map(Some)
    }

    async fn reconcile_object(
        &self,
        object: &mut ListGithubDeployments,
        cancel: &CancellationToken,
    ) -> ReconcileResult<Duration> {
        let key = object.key();
        let generation = object.generation();
        tracing::debug!(object = %key, generation, "Reconciling");

        let refreshed = self.refresh(object, cancel).await;
        match refreshed {
            Ok(records) => {
                tracing::info!(object = %key, count = records.len(), "Refreshed deployment records");
                object.status.records = records;
                object.status.set_condition(Condition::ready(generation));
            }
            Err(ReconcileError::Cancelled) => {
                tracing::debug!(object = %key, "Reconcile cancelled, status left untouched");
                return Err(ReconcileError::Cancelled);
            }
            Err(e) => {
                tracing::warn!(object = %key, error = %e, "Failed to refresh deployment records");
                object
                    .status
                    .set_condition(Condition::not_ready(generation, e.to_string()));
            }
        }

        let updated = self.store.update_status(object).await.map_err(|e| {
            tracing::error!(object = %key, error = %e, "Failed to persist status");
            ReconcileError::Persist(e)
        })?;
        *object = updated;

        Ok(object.spec.interval.as_duration())
    }

    /// Fetch, order and sanitize the records the object asks for
    async fn refresh(
        &self,
        object: &ListGithubDeployments,
        cancel: &CancellationToken,
    ) -> ReconcileResult<Vec<Value>> {
        let token = match &object.spec.token_ref {
            Some(secret) => Some(
                self.credentials
                    .secret_token(&object.metadata.namespace, secret)
                    .await?,
            ),
            None => None,
        }
        .filter(|token| !token.is_empty());

        let lister = self.listers.build(token.as_deref())?;
        let filter = Filter::from_spec(&object.spec);
        let records = fetch_all(lister.as_ref(), &filter, cancel).await?;

        Ok(order_records(records)
            .iter()
            .map(|record| self.sanitizer.sanitize(record))
            .collect())
    }
}
