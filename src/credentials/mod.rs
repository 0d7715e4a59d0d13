//! GitHub token lookup: the `PR_PULSE_GH_TOKEN` environment variable first,
//! then the system keyring.

pub mod prompt;

pub use prompt::{login, prompt_for_token};

use keyring::Entry;
use thiserror::Error;
use tracing::debug;

const KEYRING_SERVICE: &str = "pr-pulse";
const KEYRING_USER: &str = "github-token";

pub const ENV_TOKEN_VAR: &str = "PR_PULSE_GH_TOKEN";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("system keyring unavailable: {0}")]
    Unavailable(String),
    #[error("no token stored in the system keyring")]
    Missing,
    #[error("could not save token to the system keyring: {0}")]
    SaveFailed(String),
}

fn non_empty(raw: Option<String>) -> Option<String> {
    let token = raw?.trim().to_string();
    (!token.is_empty()).then_some(token)
}

/// Token from `PR_PULSE_GH_TOKEN`, ignoring an empty value
pub fn token_from_env() -> Option<String> {
    non_empty(std::env::var(ENV_TOKEN_VAR).ok())
}

fn keyring_entry() -> Result<Entry, CredentialError> {
    Entry::new(KEYRING_SERVICE, KEYRING_USER).map_err(|e| CredentialError::Unavailable(e.to_string()))
}

/// Keyring calls block (D-Bus, Keychain), so they run off the runtime threads
async fn blocking<T, F>(op: F) -> Result<T, CredentialError>
where
    F: FnOnce() -> Result<T, CredentialError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| CredentialError::Unavailable(format!("keyring task failed: {e}")))?
}

pub async fn keyring_token() -> Result<String, CredentialError> {
    blocking(|| {
        keyring_entry()?.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => CredentialError::Missing,
            other => CredentialError::Unavailable(other.to_string()),
        })
    })
    .await
}

pub async fn save_keyring_token(token: String) -> Result<(), CredentialError> {
    blocking(move || {
        keyring_entry()?
            .set_password(&token)
            .map_err(|e| CredentialError::SaveFailed(e.to_string()))
    })
    .await
}

/// Find a token, or None when neither source has one.
///
/// Fetches made without a token fail with `FetchError::MissingToken`; nothing
/// here prompts.
pub async fn resolve_token() -> Option<String> {
    if let Some(token) = token_from_env() {
        debug!("using token from {}", ENV_TOKEN_VAR);
        return Some(token);
    }

    match keyring_token().await {
        Ok(token) => {
            debug!("using token from keyring");
            non_empty(Some(token))
        }
        Err(e) => {
            debug!("no keyring token: {}", e);
            None
        }
    }
}
