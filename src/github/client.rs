use anyhow::{Context, Result};
use octocrab::Octocrab;

/// Create an authenticated GitHub client using a personal access token
pub fn create_client(token: &str, base_url: &str) -> Result<Octocrab> {
    Octocrab::builder()
        .personal_token(token.to_string())
        .base_uri(base_url)
        .context("Invalid GitHub API base URL")?
        .build()
        .context("Failed to create GitHub client")
}

/// Return the login of the user the token belongs to.
///
/// Used to confirm a freshly entered token is accepted before it is stored.
pub async fn authenticated_login(client: &Octocrab) -> Result<String> {
    let user = client
        .current()
        .user()
        .await
        .context("GitHub rejected the token")?;
    Ok(user.login)
}
