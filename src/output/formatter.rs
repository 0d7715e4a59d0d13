use chrono::{Duration, Utc};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use terminal_size::{terminal_size, Width};

use crate::status::{PrStatus, StatusRecord};

/// Width of the status column, fits "Review Required"
const STATUS_WIDTH: usize = 15;

/// Colors only when stdout is a terminal
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Shorten `title` to at most `max_chars` characters, ending in "..." when cut
fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        return title.to_string();
    }
    if max_chars <= 3 {
        return title.chars().take(max_chars).collect();
    }
    let kept: String = title.chars().take(max_chars - 3).collect();
    kept + "..."
}

fn colorize_status(status: &PrStatus, padded: &str) -> String {
    match status {
        PrStatus::Merged => padded.magenta().to_string(),
        PrStatus::OkToMerge | PrStatus::Success => padded.green().to_string(),
        PrStatus::Failure | PrStatus::Error => padded.red().to_string(),
        PrStatus::Pending | PrStatus::ReviewRequired => padded.yellow().to_string(),
        PrStatus::Unknown | PrStatus::Other(_) => padded.dimmed().to_string(),
    }
}

/// Format tracked records as a table with columns: Index, Status, Tab, Title, Ref
///
/// Index is 1-based and is what `pr-pulse open` takes.
pub fn format_status_table(records: &[StatusRecord], use_colors: bool) -> String {
    if records.is_empty() {
        return "No pull requests tracked.".to_string();
    }

    let term_width = terminal_size().map(|(Width(w), _)| usize::from(w));
    let separator = "  ";

    records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let index_str = format!("{:>2}.", idx + 1);
            let status_str = format!("{:<width$}", record.status.label(), width = STATUS_WIDTH);
            let tab_str = format!("tab {}", record.tab_id);
            let short_ref = record.short_ref();

            let fixed_width = index_str.len()
                + 1
                + STATUS_WIDTH
                + tab_str.len()
                + short_ref.len()
                + separator.len() * 3;

            let title = match term_width {
                Some(width) if width > fixed_width + 10 => {
                    truncate_title(&record.title, width - fixed_width)
                }
                Some(_) => truncate_title(&record.title, 20),
                None => record.title.clone(),
            };

            if use_colors {
                format!(
                    "{} {}{}{}{}{}{}{}",
                    index_str.dimmed(),
                    colorize_status(&record.status, &status_str),
                    separator,
                    tab_str.dimmed(),
                    separator,
                    title,
                    separator,
                    short_ref.underline()
                )
            } else {
                format!(
                    "{} {}{}{}{}{}{}{}",
                    index_str, status_str, separator, tab_str, separator, title, separator, short_ref
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a single record with detailed multi-line output (for verbose mode)
pub fn format_record_detail(record: &StatusRecord, use_colors: bool) -> String {
    let updated = format_age(Utc::now() - record.time_stamp);
    let last_modified = record.last_modified.as_deref().unwrap_or("-");

    if use_colors {
        format!(
            "{}\n  Status: {}\n  Mergeable: {}\n  Comments: {}\n  Tab: {}\n  Updated: {} ago\n  Last-Modified: {}\n  URL: {}",
            record.title.bold(),
            colorize_status(&record.status, record.status.label()),
            record.mergeable_state,
            record.comments_count,
            record.tab_id,
            updated,
            last_modified.dimmed(),
            record.html_url().underline()
        )
    } else {
        format!(
            "{}\n  Status: {}\n  Mergeable: {}\n  Comments: {}\n  Tab: {}\n  Updated: {} ago\n  Last-Modified: {}\n  URL: {}",
            record.title,
            record.status,
            record.mergeable_state,
            record.comments_count,
            record.tab_id,
            updated,
            last_modified,
            record.html_url()
        )
    }
}

/// Format records as tab-separated values for scripting
/// Columns: status, tab, comments, title, pr_ref (no headers, no colors)
pub fn format_tsv(records: &[StatusRecord]) -> String {
    records
        .iter()
        .map(|r| {
            format!(
                "{}\t{}\t{}\t{}\t{}",
                r.status,
                r.tab_id,
                r.comments_count,
                r.title,
                r.short_ref()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compact age of a record: "now", "30m", "5h", "2d", "3w"
pub fn format_age(age: Duration) -> String {
    let units = [
        (age.num_weeks(), "w"),
        (age.num_days(), "d"),
        (age.num_hours(), "h"),
        (age.num_minutes(), "m"),
    ];
    units
        .iter()
        .find(|(count, _)| *count >= 1)
        .map(|(count, unit)| format!("{count}{unit}"))
        .unwrap_or_else(|| "now".to_string())
}
