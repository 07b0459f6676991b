//! Query parameters derived from a declared spec

use crate::spec::{ListDeploymentsSpec, StateFilter};
use serde::{Deserialize, Serialize};

/// Immutable listing filter, built once per reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    owner: String,
    repo: String,
    git_ref: Option<String>,
    sha: Option<String>,
    task: Option<String>,
    environment: Option<String>,
    state: StateFilter,
    limit: usize,
}

impl Filter {
    /// Filter with no optional criteria
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, limit: usize) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            git_ref: None,
            sha: None,
            task: None,
            environment: None,
            state: StateFilter::All,
            limit,
        }
    }

    pub fn from_spec(spec: &ListDeploymentsSpec) -> Self {
        Self {
            owner: spec.owner.clone(),
            repo: spec.repo.clone(),
            git_ref: non_empty(&spec.git_ref),
            sha: non_empty(&spec.sha),
            task: non_empty(&spec.task),
            environment: non_empty(&spec.environment),
            state: spec.state,
            limit: spec.limit as usize,
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = Some(git_ref.into());
        self
    }

    pub fn with_sha(mut self, sha: impl Into<String>) -> Self {
        self.sha = Some(sha.into());
        self
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn with_state(mut self, state: StateFilter) -> Self {
        self.state = state;
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn git_ref(&self) -> Option<&str> {
        self.git_ref.as_deref()
    }

    pub fn sha(&self) -> Option<&str> {
        self.sha.as_deref()
    }

    pub fn task(&self) -> Option<&str> {
        self.task.as_deref()
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    pub fn state(&self) -> StateFilter {
        self.state
    }

    /// Maximum number of records to fetch
    pub fn limit(&self) -> usize {
        self.limit
    }
}

// An empty string filter means "no filter", as the remote API treats it.
fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}
