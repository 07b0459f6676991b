//! Error types for a reconcile pass

use crate::credentials::CredentialError;
use crate::listing::ListError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced by a reconcile pass
///
/// Credential and fetch errors render as their underlying message, which is
/// what ends up in the Ready condition.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The token reference could not be resolved
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// A page request failed
    #[error(transparent)]
    Fetch(#[from] ListError),

    /// The object could not be read
    #[error("failed to load object: {0}")]
    Load(#[source] StoreError),

    /// The status could not be written back
    #[error("failed to persist status: {0}")]
    Persist(#[source] StoreError),

    /// The object is not of the kind this reconciler serves
    #[error("unexpected object kind {api_version}/{kind}")]
    KindMismatch { api_version: String, kind: String },

    /// The pass was cancelled before it finished
    #[error("reconcile cancelled")]
    Cancelled,
}

/// Result type for reconcile operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;
