use async_trait::async_trait;
use http::header::{ACCEPT, AUTHORIZATION, IF_MODIFIED_SINCE, LAST_MODIFIED, USER_AGENT};
use http::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::github::error::FetchError;
use crate::github::types::{CommitStatus, PullFetch, RawPullRequest};

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Anything that can report pull request metadata and commit status.
///
/// The poller and the tab binder only talk to this trait, so tests can
/// drive them without a network.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Fetch a pull request, conditional on `if_modified_since` when given
    async fn fetch_pull(
        &self,
        repo: &str,
        number: u64,
        if_modified_since: Option<&str>,
    ) -> Result<PullFetch, FetchError>;

    /// Fetch the combined commit status for `sha`
    async fn fetch_commit_status(&self, repo: &str, sha: &str) -> Result<CommitStatus, FetchError>;
}

/// `PullRequestSource` backed by the GitHub REST API
#[derive(Clone)]
pub struct GitHubFetcher {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubFetcher {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            token,
        }
    }

    fn pull_url(&self, repo: &str, number: u64) -> String {
        format!("{}/repos/{}/pulls/{}", self.base_url, repo, number)
    }

    fn commit_status_url(&self, repo: &str, sha: &str) -> String {
        format!("{}/repos/{}/commits/{}/status", self.base_url, repo, sha)
    }

    async fn get(
        &self,
        url: &str,
        if_modified_since: Option<&str>,
    ) -> Result<reqwest::Response, FetchError> {
        let token = self.token.as_deref().ok_or(FetchError::MissingToken)?;

        let mut request = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("token {}", token))
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, "pr-pulse");

        if let Some(since) = if_modified_since {
            request = request.header(IF_MODIFIED_SINCE, since);
        }

        request.send().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

fn last_modified_header(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

async fn parse_body<T: DeserializeOwned>(
    url: &str,
    response: reqwest::Response,
) -> Result<T, FetchError> {
    let bytes = response.bytes().await.map_err(|source| FetchError::Transport {
        url: url.to_string(),
        source,
    })?;

    serde_json::from_slice(&bytes).map_err(|e| FetchError::Parse {
        url: url.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl PullRequestSource for GitHubFetcher {
    async fn fetch_pull(
        &self,
        repo: &str,
        number: u64,
        if_modified_since: Option<&str>,
    ) -> Result<PullFetch, FetchError> {
        let url = self.pull_url(repo, number);
        let response = self.get(&url, if_modified_since).await?;
        let status = response.status();
        let last_modified = last_modified_header(&response);

        debug!(%url, %status, ?last_modified, "fetched pull request");

        if status == StatusCode::NOT_MODIFIED {
            return Ok(PullFetch::NotModified { last_modified });
        }
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }

        let raw: RawPullRequest = parse_body(&url, response).await?;
        let pull = raw
            .validate()
            .map_err(|message| FetchError::Parse { url, message })?;

        Ok(PullFetch::Modified {
            pull,
            last_modified,
        })
    }

    async fn fetch_commit_status(&self, repo: &str, sha: &str) -> Result<CommitStatus, FetchError> {
        let url = self.commit_status_url(repo, sha);
        let response = self.get(&url, None).await?;
        let status = response.status();

        debug!(%url, %status, "fetched commit status");

        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }

        parse_body(&url, response).await
    }
}
