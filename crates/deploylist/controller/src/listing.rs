//! Page-based listing capability consumed by the pagination driver

use async_trait::async_trait;
use deploylist_types::{Filter, StateFilter};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a single page request
#[derive(Debug, Error)]
pub enum ListError {
    /// Transport failure (connect, timeout, TLS, ...)
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body was not a list of records
    #[error("invalid response body: {0}")]
    Decode(String),

    /// Client could not be constructed
    #[error("client configuration error: {0}")]
    Config(String),
}

/// Result type for listing operations
pub type ListResult<T> = Result<T, ListError>;

/// Query of a single page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListOptions {
    pub environment: Option<String>,
    pub sha: Option<String>,
    pub git_ref: Option<String>,
    pub task: Option<String>,
    pub state: StateFilter,
    /// 1-based page index
    pub page: u32,
    pub per_page: u32,
}

impl ListOptions {
    /// Options for the first page of a filter
    pub fn first_page(filter: &Filter, per_page: u32) -> Self {
        Self {
            environment: filter.environment().map(str::to_string),
            sha: filter.sha().map(str::to_string),
            git_ref: filter.git_ref().map(str::to_string),
            task: filter.task().map(str::to_string),
            state: filter.state(),
            page: 1,
            per_page,
        }
    }
}

/// Response metadata that accompanies a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    /// Requests left in the current rate-limit window
    pub rate_limit_remaining: Option<u32>,
    /// Epoch seconds at which the rate-limit window resets
    pub rate_limit_reset: Option<i64>,
    /// Next page advertised by the server, if any
    pub next_page: Option<u32>,
}

/// One page of records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Value>,
    pub meta: PageMeta,
}

impl Page {
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            records,
            meta: PageMeta::default(),
        }
    }
}

/// Lists deployments of a repository, one page per call
///
/// Transport, retry and rate limiting belong to the implementation.
#[async_trait]
pub trait DeploymentLister: Send + Sync {
    async fn list_page(&self, owner: &str, repo: &str, options: &ListOptions) -> ListResult<Page>;
}

/// Builds listers for a resolved credential
pub trait ListerFactory: Send + Sync {
    /// Build a lister; `None` means anonymous access
    fn build(&self, token: Option<&str>) -> ListResult<Arc<dyn DeploymentLister>>;
}
