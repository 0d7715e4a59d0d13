use crate::github::types::{CommitStatus, PullRequest};
use crate::status::record::{PrStatus, StatusRecord, TabId};

pub const ICON_PULL_REQUEST: &str = "assets/images/pullrequest.png";
pub const ICON_MERGED: &str = "assets/images/merged.png";
pub const ICON_PASSED: &str = "assets/images/passed.png";
pub const ICON_SOME_FAILED: &str = "assets/images/some-failed.png";
pub const ICON_BLOCKED: &str = "assets/images/blocked.png";
pub const ICON_REVIEW_REQUIRED: &str = "assets/images/review-required.png";

/// Derive the status label from the merged flag and mergeable state.
///
/// Priority: merged, then clean/unstable, then blocked, else unknown.
pub fn derive_status(merged: bool, mergeable_state: &str) -> PrStatus {
    if merged {
        return PrStatus::Merged;
    }
    match mergeable_state {
        "clean" | "unstable" => PrStatus::OkToMerge,
        "blocked" => PrStatus::Pending,
        _ => PrStatus::Unknown,
    }
}

/// Status icon for a raw mergeable state.
///
/// Keys off the upstream string only; a PR with `merged == true` whose
/// mergeable state is not "merged" gets the generic icon.
pub fn status_icon(mergeable_state: &str) -> &'static str {
    match mergeable_state {
        "merged" => ICON_MERGED,
        "clean" => ICON_PASSED,
        "unstable" => ICON_SOME_FAILED,
        "blocked" => ICON_BLOCKED,
        _ => ICON_PULL_REQUEST,
    }
}

/// Build a status record for `pull`, bound to `tab_id`
pub fn normalize(pull: &PullRequest, tab_id: TabId, last_modified: Option<String>) -> StatusRecord {
    StatusRecord {
        id: pull.id,
        title: pull.title.clone(),
        time_stamp: pull.updated_at,
        url: pull.url.clone(),
        img: ICON_PULL_REQUEST.to_string(),
        status_img: status_icon(&pull.mergeable_state).to_string(),
        status: derive_status(pull.merged, &pull.mergeable_state),
        mergeable_state: pull.mergeable_state.clone(),
        repo_name: pull.repo.clone(),
        number: pull.number,
        tab_id,
        sha: pull.head_sha.clone(),
        last_modified,
        comments_count: pull.review_comments,
    }
}

/// Refine a pending record with the head commit's combined status.
///
/// Passing checks on a still-blocked PR mean it is waiting on a reviewer.
pub fn refine_pending(mut record: StatusRecord, commit: &CommitStatus) -> StatusRecord {
    if commit.state == "success" && record.mergeable_state == "blocked" {
        record.status = PrStatus::ReviewRequired;
        record.img = ICON_REVIEW_REQUIRED.to_string();
    } else {
        record.status = PrStatus::from_label(&capitalize_first(&commit.state));
    }
    record
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
