//! Bounded pagination over a page-based listing

use crate::error::{ReconcileError, ReconcileResult};
use crate::listing::{DeploymentLister, ListOptions};
use deploylist_types::Filter;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Largest page the listing API serves
pub const MAX_PAGE_SIZE: usize = 100;

/// Fetch up to `filter.limit()` records, one page at a time
///
/// Starts at page 1 with pages of [`MAX_PAGE_SIZE`], shrinking the last
/// request to the remaining budget. Stops once a page comes back short or
/// the limit is reached. Any page error aborts the whole fetch.
pub async fn fetch_all(
    lister: &dyn DeploymentLister,
    filter: &Filter,
    cancel: &CancellationToken,
) -> ReconcileResult<Vec<Value>> {
    let limit = filter.limit();
    if limit == 0 {
        tracing::debug!(owner = filter.owner(), repo = filter.repo(), "Limit is zero, skipping fetch");
        return Ok(Vec::new());
    }

    let mut options = ListOptions::first_page(filter, MAX_PAGE_SIZE as u32);
    let mut records: Vec<Value> = Vec::with_capacity(limit.min(MAX_PAGE_SIZE));

    loop {
        let per_page = (limit - records.len()).min(MAX_PAGE_SIZE);
        options.per_page = per_page as u32;

        if cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }

        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReconcileError::Cancelled),
            result = lister.list_page(filter.owner(), filter.repo(), &options) => result?,
        };

        let received = page.records.len();
        tracing::debug!(
            owner = filter.owner(),
            repo = filter.repo(),
            page = options.page,
            per_page,
            received,
            rate_limit_remaining = ?page.meta.rate_limit_remaining,
            next_page = ?page.meta.next_page,
            "Fetched page"
        );

        records.extend(page.records);
        if received < per_page || records.len() >= limit {
            break;
        }
        options.page += 1;
    }

    records.truncate(limit);
    Ok(records)
}
