use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::github::DEFAULT_API_BASE_URL;
use crate::poll::DEFAULT_MAX_CONCURRENT_FETCHES;

const DEFAULT_POLL_INTERVAL: &str = "1m";

/// Settings read from ~/.config/pr-pulse/config.yaml.
///
/// Every field is optional. Example YAML:
/// ```yaml
/// api_base_url: https://ghe.example.com/api/v3
/// poll_interval: 2m
/// store_path: /tmp/pr-pulse/status.json
/// max_concurrent_fetches: 4
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// GitHub REST API root (default: https://api.github.com)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// How often tracked pull requests are re-fetched, as a humantime
    /// duration such as "1m" or "90s" (default: 1m)
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Status store file (default: ~/.config/pr-pulse/status.json)
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Upper bound on fetches in flight during one poll pass (default: 8)
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_poll_interval() -> String {
    DEFAULT_POLL_INTERVAL.to_string()
}

fn default_max_concurrent_fetches() -> usize {
    DEFAULT_MAX_CONCURRENT_FETCHES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            poll_interval: default_poll_interval(),
            store_path: None,
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(self.poll_interval.trim())
    }

    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(crate::store::get_store_path)
    }

    /// Check values serde cannot. Returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match self.poll_interval() {
            Ok(d) if d.is_zero() => errors.push("poll_interval must be greater than zero".to_string()),
            Ok(_) => {}
            Err(e) => errors.push(format!("poll_interval '{}' is invalid: {}", self.poll_interval, e)),
        }

        if self.max_concurrent_fetches == 0 {
            errors.push("max_concurrent_fetches must be at least 1".to_string());
        }

        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            errors.push(format!(
                "api_base_url '{}' must start with http:// or https://",
                self.api_base_url
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
