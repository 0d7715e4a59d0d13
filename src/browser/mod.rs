use anyhow::{Context, Result};

use crate::status::StatusRecord;

/// Open a tracked pull request's page in the default browser.
///
/// Returns the URL that was opened.
pub fn open_pull_request(record: &StatusRecord) -> Result<String> {
    let url = record.html_url();
    webbrowser::open(&url)
        .with_context(|| format!("Failed to open browser for {}", record.short_ref()))?;
    Ok(url)
}
