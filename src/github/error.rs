use http::StatusCode;
use thiserror::Error;

/// Failures surfaced by the remote status fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    /// No token is configured. Never retried.
    #[error("no GitHub token configured (set PR_PULSE_GH_TOKEN or run `pr-pulse auth`)")]
    MissingToken,

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("unexpected payload from {url}: {message}")]
    Parse { url: String, message: String },
}

impl FetchError {
    /// True for failures caused by missing or rejected credentials
    pub fn is_auth(&self) -> bool {
        match self {
            FetchError::MissingToken => true,
            FetchError::Status { status, .. } => *status == StatusCode::UNAUTHORIZED,
            _ => false,
        }
    }
}
