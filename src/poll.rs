use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::github::{FetchError, PullFetch, PullRequestSource};
use crate::status::{normalize, refine_pending, PrStatus, StatusRecord, TabId};
use crate::store::StatusStore;

pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// What a conditional status fetch produced
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedStatus {
    Fresh(StatusRecord),
    NotModified { last_modified: Option<String> },
}

/// Fetch and normalize the status of one pull request.
///
/// With `refine` set, a `Pending` result is refined with the head commit's
/// combined status, which costs a second request.
pub async fn fetch_status(
    source: &dyn PullRequestSource,
    repo: &str,
    number: u64,
    tab_id: TabId,
    if_modified_since: Option<&str>,
    refine: bool,
) -> Result<FetchedStatus, FetchError> {
    match source.fetch_pull(repo, number, if_modified_since).await? {
        PullFetch::NotModified { last_modified } => Ok(FetchedStatus::NotModified { last_modified }),
        PullFetch::Modified {
            pull,
            last_modified,
        } => {
            let record = normalize(&pull, tab_id, last_modified);
            if refine && record.status == PrStatus::Pending {
                let commit = source
                    .fetch_commit_status(&record.repo_name, &record.sha)
                    .await?;
                return Ok(FetchedStatus::Fresh(refine_pending(record, &commit)));
            }
            Ok(FetchedStatus::Fresh(record))
        }
    }
}

/// Counts from one poll pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub checked: usize,
    pub updated: usize,
    pub not_modified: usize,
    /// Record was deleted while its fetch was in flight
    pub vanished: usize,
    pub failed: usize,
}

enum RefreshOutcome {
    Updated,
    NotModified,
    Vanished,
}

/// Re-fetches every tracked record and merges the results into the store
#[derive(Clone)]
pub struct Poller {
    source: Arc<dyn PullRequestSource>,
    store: Arc<StatusStore>,
    max_concurrent: usize,
}

impl Poller {
    pub fn new(source: Arc<dyn PullRequestSource>, store: Arc<StatusStore>) -> Self {
        Self {
            source,
            store,
            max_concurrent: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Run one pass over all tracked records.
    ///
    /// Fetches run concurrently; a failing record is logged and counted and
    /// does not stop the others. Only failing to read the store is an error.
    pub async fn poll_once(&self) -> Result<PollSummary> {
        let records = self.store.get_all()?;
        let mut summary = PollSummary {
            checked: records.len(),
            ..Default::default()
        };

        if records.is_empty() {
            debug!("No tracked pull requests to poll");
            return Ok(summary);
        }

        debug!("Polling {} tracked pull requests", records.len());

        let mut pending = records.into_values();
        let mut futures = FuturesUnordered::new();

        // Fill initial batch
        for record in pending.by_ref().take(self.max_concurrent) {
            futures.push(self.refresh(record));
        }

        // Process results and feed new tasks
        while let Some((record_ref, result)) = futures.next().await {
            match result {
                Ok(RefreshOutcome::Updated) => summary.updated += 1,
                Ok(RefreshOutcome::NotModified) => summary.not_modified += 1,
                Ok(RefreshOutcome::Vanished) => summary.vanished += 1,
                Err(e) => {
                    summary.failed += 1;
                    match e.downcast_ref::<FetchError>() {
                        Some(fetch_err) if fetch_err.is_auth() => {
                            warn!("Skipping {}: {}", record_ref, fetch_err)
                        }
                        _ => warn!("Failed to refresh {}: {:#}", record_ref, e),
                    }
                }
            }

            if let Some(next) = pending.next() {
                futures.push(self.refresh(next));
            }
        }

        info!(
            checked = summary.checked,
            updated = summary.updated,
            not_modified = summary.not_modified,
            vanished = summary.vanished,
            failed = summary.failed,
            "poll pass finished"
        );

        Ok(summary)
    }

    async fn refresh(&self, record: StatusRecord) -> (String, Result<RefreshOutcome>) {
        let record_ref = record.short_ref();
        let result = self.refresh_record(record).await;
        (record_ref, result)
    }

    async fn refresh_record(&self, record: StatusRecord) -> Result<RefreshOutcome> {
        let fetched = fetch_status(
            self.source.as_ref(),
            &record.repo_name,
            record.number,
            record.tab_id,
            record.last_modified.as_deref(),
            true,
        )
        .await?;

        match fetched {
            FetchedStatus::Fresh(updated) => match self.store.merge_existing(updated)? {
                Some(_) => Ok(RefreshOutcome::Updated),
                None => Ok(RefreshOutcome::Vanished),
            },
            FetchedStatus::NotModified { last_modified } => {
                if let Some(last_modified) = last_modified {
                    self.store.set_last_modified(record.id, &last_modified)?;
                }
                Ok(RefreshOutcome::NotModified)
            }
        }
    }
}
