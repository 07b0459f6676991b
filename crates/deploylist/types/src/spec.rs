//! Desired state of a deployment listing

use crate::interval::Interval;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};
use thiserror::Error;

/// Default maximum number of deployments to mirror
pub const DEFAULT_LIMIT: u32 = 100;

/// Key read from a secret when the reference does not name one
pub const DEFAULT_SECRET_KEY: &str = "token";

/// Desired state of a `ListGithubDeployments` object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDeploymentsSpec {
    /// How often the remote API is queried
    #[serde(default)]
    pub interval: Interval,

    /// Repository owner (user or organization)
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Secret holding the API token; anonymous access when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_ref: Option<SecretRef>,

    /// Only deployments for this ref (branch, tag or SHA)
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,

    /// Only deployments for this commit SHA
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,

    /// Only deployments for this task (e.g. `deploy`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,

    /// Only deployments to this environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// State filter, `all` by default
    #[serde(default)]
    pub state: StateFilter,

    /// Maximum number of deployments to fetch
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl ListDeploymentsSpec {
    /// Create a spec for a repository with every optional field defaulted
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            interval: Interval::default(),
            owner: owner.into(),
            repo: repo.into(),
            token_ref: None,
            git_ref: None,
            sha: None,
            task: None,
            environment: None,
            state: StateFilter::default(),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Validate the spec
    pub fn validate(&self) -> Result<(), SpecValidationError> {
        if self.owner.trim().is_empty() {
            return Err(SpecValidationError::EmptyOwner);
        }

        if self.repo.trim().is_empty() {
            return Err(SpecValidationError::EmptyRepo);
        }

        if self.interval.is_zero() {
            return Err(SpecValidationError::ZeroInterval);
        }

        if let Some(token_ref) = &self.token_ref {
            if token_ref.secret_name.trim().is_empty() {
                return Err(SpecValidationError::InvalidTokenRef(
                    "secretName cannot be empty".into(),
                ));
            }
            token_ref.validate()?;
        }

        Ok(())
    }
}

/// Reference to a key inside a named secret
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    pub secret_name: String,

    #[serde(default = "default_secret_key")]
    pub key: String,
}

fn default_secret_key() -> String {
    DEFAULT_SECRET_KEY.to_string()
}

impl SecretRef {
    pub fn new(secret_name: impl Into<String>) -> Self {
        Self {
            secret_name: secret_name.into(),
            key: default_secret_key(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Check that the secret name and key each name a single entry
    pub fn validate(&self) -> Result<(), SpecValidationError> {
        for (field, value) in [("secretName", &self.secret_name), ("key", &self.key)] {
            if !is_path_segment(value) {
                return Err(SpecValidationError::InvalidTokenRef(format!(
                    "{field} {value:?} must be a single path segment"
                )));
            }
        }
        Ok(())
    }
}

/// Whether `value` is exactly one normal path component
///
/// Rejects empty strings, `.`, `..` and anything containing `/` or `\`.
pub fn is_path_segment(value: &str) -> bool {
    if value.is_empty() || value.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(segment)), None) => segment.to_str() == Some(value),
        _ => false,
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.secret_name, self.key)
    }
}

/// State filter on listed records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateFilter {
    #[default]
    All,
    Open,
    Closed,
}

impl StateFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateFilter::All => "all",
            StateFilter::Open => "open",
            StateFilter::Closed => "closed",
        }
    }
}

impl fmt::Display for StateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spec validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecValidationError {
    #[error("owner cannot be empty")]
    EmptyOwner,

    #[error("repo cannot be empty")]
    EmptyRepo,

    #[error("interval must be greater than zero")]
    ZeroInterval,

    #[error("invalid tokenRef: {0}")]
    InvalidTokenRef(String),

    #[error("invalid {field} {value:?}: must be a lowercase DNS label")]
    InvalidName { field: &'static str, value: String },
}
