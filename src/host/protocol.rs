use serde::{Deserialize, Serialize};

use crate::status::TabId;

/// Browser events, one JSON object per line on stdin
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    /// A page finished loading in a tab
    Navigated { tab_id: TabId, url: String },
    TabRemoved { tab_id: TabId },
    NotificationClicked { notification_id: String },
}

/// Commands for the browser, one JSON object per line on stdout
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum HostCommand {
    Notify {
        id: String,
        title: String,
        message: String,
    },
    ActivateTab { tab_id: TabId },
}
