//! deploylist controller - reconciles `ListGithubDeployments` objects
//!
//! Each pass pages through a repository's deployments, orders them by id,
//! strips them down to a persistable subset and writes the result into the
//! object's status together with a `Ready` condition.
//!
//! The moving parts are behind traits so they can be swapped out:
//!
//! - [`ObjectStore`]: where declared objects and their status live
//! - [`CredentialResolver`]: turns a secret reference into a token
//! - [`ListerFactory`] / [`DeploymentLister`]: the remote listing, with
//!   [`GithubClient`] as the REST implementation
//!
//! [`Reconciler`] ties them together.

#![deny(unsafe_code)]

pub mod credentials;
pub mod error;
pub mod github;
pub mod listing;
pub mod ordering;
pub mod pagination;
pub mod reconciler;
pub mod sanitize;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use credentials::{
    CredentialError, CredentialResolver, CredentialResult, DirectorySecrets, InMemorySecrets,
};
pub use error::{ReconcileError, ReconcileResult};
pub use github::{GithubClient, GithubClientFactory, GithubConfig, DEFAULT_API_URL};
pub use listing::{
    DeploymentLister, ListError, ListOptions, ListResult, ListerFactory, Page, PageMeta,
};
pub use ordering::{order_records, record_id};
pub use pagination::{fetch_all, MAX_PAGE_SIZE};
pub use reconciler::Reconciler;
pub use sanitize::{Sanitizer, Shape};
pub use store::{InMemoryObjectStore, ObjectStore, StoreError, StoreResult};
