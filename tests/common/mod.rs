#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use http::StatusCode;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pr_pulse::github::{CommitStatus, FetchError, PullFetch, PullRequest, PullRequestSource};
use pr_pulse::status::{PrStatus, StatusRecord};
use pr_pulse::store::StatusStore;

/// Scripted answer for one pull request
#[derive(Clone)]
pub enum PullReply {
    Ok {
        pull: PullRequest,
        last_modified: Option<String>,
    },
    NotModified {
        last_modified: Option<String>,
    },
    Fail,
}

/// In-memory `PullRequestSource` with scripted replies and a call log
#[derive(Default)]
pub struct FakeSource {
    pulls: Mutex<HashMap<(String, u64), PullReply>>,
    commit_states: Mutex<HashMap<String, String>>,
    pull_calls: Mutex<Vec<(String, u64, Option<String>)>>,
    commit_calls: Mutex<Vec<String>>,
    /// Store records with this id are deleted while their fetch is in flight
    delete_during_fetch: Mutex<Option<(Arc<StatusStore>, u64)>>,
}

impl FakeSource {
    pub fn set_pull(&self, repo: &str, number: u64, reply: PullReply) {
        self.pulls
            .lock()
            .unwrap()
            .insert((repo.to_string(), number), reply);
    }

    pub fn set_commit_state(&self, sha: &str, state: &str) {
        self.commit_states
            .lock()
            .unwrap()
            .insert(sha.to_string(), state.to_string());
    }

    pub fn delete_during_fetch(&self, store: Arc<StatusStore>, id: u64) {
        *self.delete_during_fetch.lock().unwrap() = Some((store, id));
    }

    pub fn pull_calls(&self) -> Vec<(String, u64, Option<String>)> {
        self.pull_calls.lock().unwrap().clone()
    }

    pub fn commit_calls(&self) -> Vec<String> {
        self.commit_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PullRequestSource for FakeSource {
    async fn fetch_pull(
        &self,
        repo: &str,
        number: u64,
        if_modified_since: Option<&str>,
    ) -> Result<PullFetch, FetchError> {
        self.pull_calls.lock().unwrap().push((
            repo.to_string(),
            number,
            if_modified_since.map(|s| s.to_string()),
        ));

        if let Some((store, id)) = self.delete_during_fetch.lock().unwrap().as_ref() {
            let id = *id;
            store.remove_where(|r| r.id == id).unwrap();
        }

        let reply = self
            .pulls
            .lock()
            .unwrap()
            .get(&(repo.to_string(), number))
            .cloned();

        match reply {
            Some(PullReply::Ok {
                pull,
                last_modified,
            }) => Ok(PullFetch::Modified {
                pull,
                last_modified,
            }),
            Some(PullReply::NotModified { last_modified }) => {
                Ok(PullFetch::NotModified { last_modified })
            }
            Some(PullReply::Fail) | None => Err(FetchError::Status {
                url: format!("fake://{}/{}", repo, number),
                status: StatusCode::BAD_GATEWAY,
            }),
        }
    }

    async fn fetch_commit_status(&self, repo: &str, sha: &str) -> Result<CommitStatus, FetchError> {
        self.commit_calls.lock().unwrap().push(sha.to_string());
        match self.commit_states.lock().unwrap().get(sha) {
            Some(state) => Ok(CommitStatus {
                state: state.clone(),
                sha: Some(sha.to_string()),
                total_count: 1,
            }),
            None => Err(FetchError::Status {
                url: format!("fake://{}/commits/{}", repo, sha),
                status: StatusCode::NOT_FOUND,
            }),
        }
    }
}

/// Pull request `number` in o/r with GitHub id `id`
pub fn pull(id: u64, number: u64, merged: bool, mergeable_state: &str, comments: u64) -> PullRequest {
    PullRequest {
        id,
        number,
        title: format!("Pull request {}", number),
        url: format!("https://api.github.com/repos/o/r/pulls/{}", number),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        merged,
        mergeable_state: mergeable_state.to_string(),
        review_comments: comments,
        repo: "o/r".to_string(),
        head_sha: format!("sha-{}", number),
    }
}

/// A stored record as the tab binder would have inserted it
pub fn tracked(id: u64, number: u64, tab_id: i64, status: PrStatus, comments: u64) -> StatusRecord {
    let mergeable_state = match status {
        PrStatus::OkToMerge => "clean",
        PrStatus::Pending => "blocked",
        _ => "unknown",
    };
    let mut record = pr_pulse::status::normalize(
        &pull(id, number, false, mergeable_state, comments),
        tab_id,
        None,
    );
    record.status = status;
    record
}
