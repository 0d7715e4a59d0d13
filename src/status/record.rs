use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Browser tab identifier
pub type TabId = i64;

/// Simplified pull request status shown to the user.
///
/// Serialized as its label. Two statuses compare equal when their labels do,
/// so a commit state of "pending" is the same status as the derived `Pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PrStatus {
    Merged,
    OkToMerge,
    Pending,
    Unknown,
    ReviewRequired,
    Success,
    Failure,
    Error,
    /// Any other capitalized commit status word
    Other(String),
}

impl PrStatus {
    pub fn label(&self) -> &str {
        match self {
            PrStatus::Merged => "Merged",
            PrStatus::OkToMerge => "OK to Merge",
            PrStatus::Pending => "Pending",
            PrStatus::Unknown => "Unknown",
            PrStatus::ReviewRequired => "Review Required",
            PrStatus::Success => "Success",
            PrStatus::Failure => "Failure",
            PrStatus::Error => "Error",
            PrStatus::Other(label) => label,
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "Merged" => PrStatus::Merged,
            "OK to Merge" => PrStatus::OkToMerge,
            "Pending" => PrStatus::Pending,
            "Unknown" => PrStatus::Unknown,
            "Review Required" => PrStatus::ReviewRequired,
            "Success" => PrStatus::Success,
            "Failure" => PrStatus::Failure,
            "Error" => PrStatus::Error,
            other => PrStatus::Other(other.to_string()),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, PrStatus::Unknown)
    }
}

impl PartialEq for PrStatus {
    fn eq(&self, other: &Self) -> bool {
        self.label() == other.label()
    }
}

impl Eq for PrStatus {}

impl fmt::Display for PrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for PrStatus {
    fn from(label: String) -> Self {
        PrStatus::from_label(&label)
    }
}

impl From<PrStatus> for String {
    fn from(status: PrStatus) -> Self {
        status.label().to_string()
    }
}

/// Tracked status snapshot for one pull request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: u64,
    pub title: String,
    pub time_stamp: DateTime<Utc>,
    pub url: String,
    pub img: String,
    pub status_img: String,
    pub status: PrStatus,
    pub mergeable_state: String,
    pub repo_name: String,
    pub number: u64,
    pub tab_id: TabId,
    pub sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub comments_count: u64,
}

impl StatusRecord {
    /// Browser URL of the pull request page
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/pull/{}", self.repo_name, self.number)
    }

    /// Return a short reference in the format "owner/repo#123"
    pub fn short_ref(&self) -> String {
        format!("{}#{}", self.repo_name, self.number)
    }
}
