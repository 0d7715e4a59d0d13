use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Pull request metadata after validation at the fetch boundary
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub url: String,              // API URL, e.g. https://api.github.com/repos/o/r/pulls/1
    pub updated_at: DateTime<Utc>,
    pub merged: bool,
    pub mergeable_state: String,  // "unknown" when upstream omits it
    pub review_comments: u64,
    pub repo: String,             // "owner/repo" of the head repository
    pub head_sha: String,
}

/// Aggregated commit status for a single commit
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommitStatus {
    /// One of "success", "failure", "error", "pending"
    pub state: String,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub total_count: u64,
}

/// Result of a conditional pull request fetch
#[derive(Debug, Clone, PartialEq)]
pub enum PullFetch {
    /// HTTP 200 with a fresh body
    Modified {
        pull: PullRequest,
        last_modified: Option<String>,
    },
    /// HTTP 304; the body is absent but a new validator may still be present
    NotModified { last_modified: Option<String> },
}

impl PullFetch {
    pub fn last_modified(&self) -> Option<&str> {
        match self {
            PullFetch::Modified { last_modified, .. } | PullFetch::NotModified { last_modified } => {
                last_modified.as_deref()
            }
        }
    }
}

// Wire shapes as returned by GET /repos/{repo}/pulls/{number}. Only the
// fields we consume are declared.

#[derive(Debug, Deserialize)]
pub(crate) struct RawPullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub merged: Option<bool>,
    #[serde(default)]
    pub mergeable_state: Option<String>,
    #[serde(default)]
    pub review_comments: Option<u64>,
    pub head: RawHead,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawHead {
    pub sha: String,
    // null when the head fork has been deleted
    #[serde(default)]
    pub repo: Option<RawRepo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRepo {
    pub full_name: String,
}

impl RawPullRequest {
    /// Convert the wire shape into a validated `PullRequest`.
    ///
    /// Returns an error message when the payload is missing data the
    /// status record cannot be built without.
    pub(crate) fn validate(self) -> Result<PullRequest, String> {
        let repo = self
            .head
            .repo
            .map(|r| r.full_name)
            .ok_or_else(|| format!("pull request {} has no head repository", self.id))?;

        Ok(PullRequest {
            id: self.id,
            number: self.number,
            title: self.title,
            url: self.url,
            updated_at: self.updated_at,
            merged: self.merged.unwrap_or(false),
            mergeable_state: self.mergeable_state.unwrap_or_else(|| "unknown".to_string()),
            review_comments: self.review_comments.unwrap_or(0),
            repo,
            head_sha: self.head.sha,
        })
    }
}
