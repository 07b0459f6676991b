//! GitHub REST client for the repository deployments listing

use crate::listing::{DeploymentLister, ListError, ListOptions, ListResult, ListerFactory, Page, PageMeta};
use async_trait::async_trait;
use deploylist_types::StateFilter;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{Client, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Public GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
const MEDIA_TYPE: &str = "application/vnd.github+json";

/// Settings shared by every client the factory builds
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// API base URL, e.g. `https://ghe.example.com/api/v3` for GitHub Enterprise
    pub api_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: concat!("deploylist/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Deployment lister backed by the GitHub REST API
pub struct GithubClient {
    client: Client,
    base_url: Url,
}

impl GithubClient {
    /// Create a client; `token` of `None` gives anonymous access
    pub fn new(config: &GithubConfig, token: Option<&str>) -> ListResult<Self> {
        let base_url = Url::parse(config.api_url.trim_end_matches('/'))
            .map_err(|e| ListError::Config(format!("invalid API URL {}: {}", config.api_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(MEDIA_TYPE));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ListError::Config("token contains invalid characters".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base_url })
    }

    fn deployments_url(&self, owner: &str, repo: &str) -> ListResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ListError::Config(format!("API URL {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["repos", owner, repo, "deployments"]);
        Ok(url)
    }
}

#[async_trait]
impl DeploymentLister for GithubClient {
    async fn list_page(&self, owner: &str, repo: &str, options: &ListOptions) -> ListResult<Page> {
        let url = self.deployments_url(owner, repo)?;

        let mut query: Vec<(&str, String)> = vec![
            ("page", options.page.to_string()),
            ("per_page", options.per_page.to_string()),
        ];
        if let Some(sha) = &options.sha {
            query.push(("sha", sha.clone()));
        }
        if let Some(git_ref) = &options.git_ref {
            query.push(("ref", git_ref.clone()));
        }
        if let Some(task) = &options.task {
            query.push(("task", task.clone()));
        }
        if let Some(environment) = &options.environment {
            query.push(("environment", environment.clone()));
        }
        if options.state != StateFilter::All {
            query.push(("state", options.state.to_string()));
        }

        let response = self.client.get(url).query(&query).send().await?;
        let status = response.status();
        let meta = page_meta(response.headers());
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ListError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let records: Vec<Value> =
            serde_json::from_str(&body).map_err(|e| ListError::Decode(e.to_string()))?;

        Ok(Page { records, meta })
    }
}

/// Builds [`GithubClient`]s from a shared configuration
#[derive(Debug, Clone, Default)]
pub struct GithubClientFactory {
    config: GithubConfig,
}

impl GithubClientFactory {
    pub fn new(config: GithubConfig) -> Self {
        Self { config }
    }
}

impl ListerFactory for GithubClientFactory {
    fn build(&self, token: Option<&str>) -> ListResult<Arc<dyn DeploymentLister>> {
        Ok(Arc::new(GithubClient::new(&self.config, token)?))
    }
}

fn page_meta(headers: &HeaderMap) -> PageMeta {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    PageMeta {
        rate_limit_remaining: header("x-ratelimit-remaining").and_then(|v| v.parse().ok()),
        rate_limit_reset: header("x-ratelimit-reset").and_then(|v| v.parse().ok()),
        next_page: headers
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_page_from_link),
    }
}

/// Extract the `page` parameter of the `rel="next"` entry of a Link header
fn next_page_from_link(link: &str) -> Option<u32> {
    link.split(',')
        .find(|part| part.contains("rel=\"next\""))
        .and_then(|part| {
            let start = part.find('<')? + 1;
            let end = part.find('>')?;
            Url::parse(part.get(start..end)?).ok()
        })
        .and_then(|url| {
            url.query_pairs()
                .find(|(k, _)| k == "page")
                .and_then(|(_, v)| v.parse().ok())
        })
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
