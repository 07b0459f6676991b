//! deploylist types - declared object, status and filter
//!
//! A `ListGithubDeployments` object declares which deployments of a GitHub
//! repository should be mirrored. The reconciler reads its spec, derives a
//! [`Filter`], and writes the sanitized records plus a `Ready` condition back
//! into its status.
//!
//! ## Key Concepts
//!
//! - **Spec**: owner/repo, optional ref/sha/task/environment filters, state
//!   filter, limit and polling interval
//! - **Status**: conditions keyed by type and the ordered record list
//! - **Filter**: immutable query parameters built once per pass
//! - **ObjectKind**: explicit type descriptor handed to the reconciler

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod filter;
pub mod ids;
pub mod interval;
pub mod object;
pub mod spec;
pub mod status;

pub use filter::Filter;
pub use ids::{is_dns_label, ObjectKey, ObjectKind};
pub use interval::{parse_interval, Interval, IntervalParseError};
pub use object::{ListGithubDeployments, ObjectMeta};
pub use spec::{is_path_segment, ListDeploymentsSpec, SecretRef, SpecValidationError, StateFilter};
pub use status::{
    Condition, ConditionStatus, ListDeploymentsStatus, READY, REASON_ERROR, REASON_SUCCESS,
};
