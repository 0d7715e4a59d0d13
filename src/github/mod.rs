pub mod client;
pub mod error;
pub mod fetcher;
pub mod types;

pub use client::{authenticated_login, create_client};
pub use error::FetchError;
pub use fetcher::{GitHubFetcher, PullRequestSource, DEFAULT_API_BASE_URL};
pub use types::{CommitStatus, PullFetch, PullRequest};
