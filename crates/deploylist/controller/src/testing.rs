//! Scripted listing doubles and record fixtures

use crate::listing::{DeploymentLister, ListError, ListOptions, ListResult, ListerFactory, Page};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory listing that pages over a fixed record set
///
/// Pages are cut the way a page-indexed API cuts them: page `p` of size
/// `n` starts at offset `(p - 1) * n`.
#[derive(Debug, Default)]
pub struct ScriptedLister {
    records: Mutex<Vec<Value>>,
    failures: Mutex<HashMap<u32, (u16, String)>>,
    served_page_size: Option<usize>,
    calls: Mutex<Vec<ListOptions>>,
}

impl ScriptedLister {
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Answer `page` with an API error
    pub fn fail_on_page(self, page: u32, status: u16, message: impl Into<String>) -> Self {
        self.set_failure(page, status, message);
        self
    }

    /// Serve pages of `size` regardless of the requested page size
    pub fn ignoring_page_size(mut self, size: usize) -> Self {
        self.served_page_size = Some(size);
        self
    }

    pub fn set_failure(&self, page: u32, status: u16, message: impl Into<String>) {
        lock(&self.failures).insert(page, (status, message.into()));
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    pub fn set_records(&self, records: Vec<Value>) {
        *lock(&self.records) = records;
    }

    /// Options of every call received so far
    pub fn calls(&self) -> Vec<ListOptions> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl DeploymentLister for ScriptedLister {
    async fn list_page(&self, _owner: &str, _repo: &str, options: &ListOptions) -> ListResult<Page> {
        lock(&self.calls).push(options.clone());

        if let Some((status, message)) = lock(&self.failures).get(&options.page).cloned() {
            return Err(ListError::Api { status, message });
        }

        let records = lock(&self.records);
        let size = self.served_page_size.unwrap_or(options.per_page as usize);
        let start = (options.page.max(1) as usize - 1) * options.per_page as usize;
        let page = records.iter().skip(start).take(size).cloned().collect();
        Ok(Page::new(page))
    }
}

/// Factory handing out one shared lister and recording the tokens it saw
pub struct StaticListerFactory {
    lister: Arc<dyn DeploymentLister>,
    tokens: Mutex<Vec<Option<String>>>,
}

impl StaticListerFactory {
    pub fn new(lister: Arc<dyn DeploymentLister>) -> Self {
        Self {
            lister,
            tokens: Mutex::new(Vec::new()),
        }
    }

    /// Tokens passed to [`ListerFactory::build`], in call order
    pub fn tokens(&self) -> Vec<Option<String>> {
        lock(&self.tokens).clone()
    }
}

impl ListerFactory for StaticListerFactory {
    fn build(&self, token: Option<&str>) -> ListResult<Arc<dyn DeploymentLister>> {
        lock(&self.tokens).push(token.map(str::to_string));
        Ok(self.lister.clone())
    }
}

/// A user object as the API embeds it, with every public field populated
pub fn github_user(id: u64, login: &str) -> Value {
    json!({
        "login": login,
        "id": id,
        "node_id": format!("MDQ6VXNlcj{}", id),
        "avatar_url": format!("https://avatars.githubusercontent.com/u/{}?v=4", id),
        "gravatar_id": "",
        "url": format!("https://api.github.com/users/{}", login),
        "html_url": format!("https://github.com/{}", login),
        "followers_url": format!("https://api.github.com/users/{}/followers", login),
        "following_url": format!("https://api.github.com/users/{}/following{{/other_user}}", login),
        "gists_url": format!("https://api.github.com/users/{}/gists{{/gist_id}}", login),
        "starred_url": format!("https://api.github.com/users/{}/starred{{/owner}}{{/repo}}", login),
        "subscriptions_url": format!("https://api.github.com/users/{}/subscriptions", login),
        "organizations_url": format!("https://api.github.com/users/{}/orgs", login),
        "repos_url": format!("https://api.github.com/users/{}/repos", login),
        "events_url": format!("https://api.github.com/users/{}/events{{/privacy}}", login),
        "received_events_url": format!("https://api.github.com/users/{}/received_events", login),
        "type": "User",
        "site_admin": false,
        "name": "Alice Example",
        "company": "Example Corp",
        "blog": "https://example.com",
        "location": "Berlin",
        "email": format!("{}@example.com", login),
        "hireable": null,
        "bio": "Ships things",
        "twitter_username": null,
        "public_repos": 42,
        "public_gists": 3,
        "followers": 100,
        "following": 7,
        "created_at": "2015-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z",
    })
}

/// A deployment record as returned by the deployments listing
pub fn deployment(id: u64) -> Value {
    json!({
        "url": format!("https://api.github.com/repos/acme/shop/deployments/{}", id),
        "id": id,
        "node_id": format!("MDEwOkRlcGxveW1lbnQ{}", id),
        "sha": "a84d88e7554fc1fa21bcbc4efae3c782a70d2b9d",
        "ref": "main",
        "task": "deploy",
        "payload": {},
        "original_environment": "staging",
        "environment": "production",
        "description": null,
        "creator": github_user(7, "alice"),
        "created_at": "2024-03-01T12:00:00Z",
        "updated_at": "2024-03-01T12:05:00Z",
        "statuses_url": format!("https://api.github.com/repos/acme/shop/deployments/{}/statuses", id),
        "repository_url": "https://api.github.com/repos/acme/shop",
        "transient_environment": false,
        "production_environment": true,
    })
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
