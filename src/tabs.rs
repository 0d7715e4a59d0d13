use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

use crate::github::PullRequestSource;
use crate::notify::NotificationId;
use crate::poll::{fetch_status, FetchedStatus};
use crate::status::{StatusRecord, TabId};
use crate::store::{StatusStore, StoreChange};

/// A pull request named by a browser URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrLocator {
    pub repo: String, // "owner/repo"
    pub number: u64,
}

/// Parse `https://github.com/<owner>/<repo>/pull/<number>[/...][#...][?...]`.
///
/// The host must be exactly `github.com` (optionally `www.`); subdomains and
/// lookalike hosts are rejected.
pub fn parse_pr_url(url: &str) -> Option<PrLocator> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    let path = rest.strip_prefix("github.com/")?;
    let path = path.split(['#', '?']).next().unwrap_or(path);
    let parts: Vec<&str> = path.split('/').collect();

    match parts.as_slice() {
        [owner, repo, "pull", number, ..] if !owner.is_empty() && !repo.is_empty() => {
            let number = number.parse().ok()?;
            Some(PrLocator {
                repo: format!("{}/{}", owner, repo),
                number,
            })
        }
        _ => None,
    }
}

/// Tab that raised the notification with `notification_id`
pub fn notification_target(notification_id: &str) -> Option<TabId> {
    NotificationId::parse(notification_id).map(|id| id.tab_id)
}

/// Binds status records to the browser tabs that opened them
#[derive(Clone)]
pub struct TabBinder {
    source: Arc<dyn PullRequestSource>,
    store: Arc<StatusStore>,
}

impl TabBinder {
    pub fn new(source: Arc<dyn PullRequestSource>, store: Arc<StatusStore>) -> Self {
        Self { source, store }
    }

    /// Start tracking the pull request `url` points at, bound to `tab_id`.
    ///
    /// Returns `Ok(None)` for URLs that are not pull request pages. The tab's
    /// previous record, if it pointed at another pull request, is dropped.
    pub async fn on_navigation(&self, tab_id: TabId, url: &str) -> Result<Option<StoreChange>> {
        let Some(locator) = parse_pr_url(url) else {
            debug!(tab_id, url, "not a pull request page");
            return Ok(None);
        };

        let fetched = fetch_status(
            self.source.as_ref(),
            &locator.repo,
            locator.number,
            tab_id,
            None,
            false,
        )
        .await?;

        let record = match fetched {
            FetchedStatus::Fresh(record) => record,
            // Unconditional request; a 304 here means there is nothing to insert
            FetchedStatus::NotModified { .. } => return Ok(None),
        };

        let id = record.id;
        self.store
            .remove_where(|r: &StatusRecord| r.tab_id == tab_id && r.id != id)?;

        info!(tab_id, pr = %record.short_ref(), status = %record.status, "tracking pull request");
        Ok(Some(self.store.upsert(record)?))
    }

    /// Stop tracking everything bound to a closed tab
    pub fn on_tab_removed(&self, tab_id: TabId) -> Result<Vec<StatusRecord>> {
        let removed = self.store.remove_where(|r| r.tab_id == tab_id)?;
        if !removed.is_empty() {
            info!(tab_id, count = removed.len(), "stopped tracking closed tab");
        }
        Ok(removed)
    }

    /// Tab to bring forward when the notification `notification_id` is clicked
    pub fn on_notification_clicked(&self, notification_id: &str) -> Option<TabId> {
        notification_target(notification_id)
    }
}
