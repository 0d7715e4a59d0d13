use anyhow::{bail, Context, Result};

use super::save_keyring_token;
use crate::github::{authenticated_login, create_client};

/// Read a personal access token from the terminal without echoing it
pub fn prompt_for_token() -> Result<String> {
    eprintln!("pr-pulse needs a GitHub personal access token with read access to pull requests.");
    eprintln!("Create one at https://github.com/settings/tokens");

    let entered = rpassword::prompt_password("Token: ").context("Failed to read token")?;
    let token = entered.trim();
    if token.is_empty() {
        bail!("No token entered");
    }
    Ok(token.to_string())
}

/// Prompt for a token, check GitHub accepts it, then save it to the keyring.
///
/// Returns the login the token belongs to.
pub async fn login(api_base_url: &str) -> Result<String> {
    let token = prompt_for_token()?;

    let client = create_client(&token, api_base_url)?;
    let login = authenticated_login(&client).await?;

    save_keyring_token(token)
        .await
        .context("Failed to save token")?;

    Ok(login)
}
