use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::sync::Mutex;
use tracing::info;

use crate::host::protocol::HostCommand;
use crate::notify::Notification;
use crate::status::TabId;

/// Destination for notifications and tab activation requests
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &Notification) -> Result<()>;

    /// Bring the tab that raised a clicked notification to the front
    fn activate_tab(&self, tab_id: TabId) -> Result<()>;
}

/// Writes host commands as one JSON object per line (stdout in `pr-pulse run`)
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> Result<W> {
        self.out
            .into_inner()
            .map_err(|_| anyhow!("notification output lock poisoned"))
    }

    fn emit(&self, command: &HostCommand) -> Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow!("notification output lock poisoned"))?;
        serde_json::to_writer(&mut *out, command).context("Failed to serialize host command")?;
        out.write_all(b"\n").context("Failed to write host command")?;
        out.flush().context("Failed to flush host command")?;
        Ok(())
    }
}

impl<W: Write + Send> NotificationSink for JsonLinesSink<W> {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        self.emit(&HostCommand::Notify {
            id: notification.id.to_string(),
            title: notification.title.clone(),
            message: notification.message.clone(),
        })
    }

    fn activate_tab(&self, tab_id: TabId) -> Result<()> {
        self.emit(&HostCommand::ActivateTab { tab_id })
    }
}

/// Logs notifications instead of sending them anywhere (one-shot commands)
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        info!(id = %notification.id, title = %notification.title, "{}", notification.message);
        Ok(())
    }

    fn activate_tab(&self, tab_id: TabId) -> Result<()> {
        info!(tab_id, "activate tab");
        Ok(())
    }
}

/// Collects everything it receives; for embedding and tests
#[derive(Debug, Default)]
pub struct MemorySink {
    notifications: Mutex<Vec<Notification>>,
    activated: Mutex<Vec<TabId>>,
}

impl MemorySink {
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn activated_tabs(&self) -> Vec<TabId> {
        self.activated.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl NotificationSink for MemorySink {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        self.notifications
            .lock()
            .map_err(|_| anyhow!("memory sink lock poisoned"))?
            .push(notification.clone());
        Ok(())
    }

    fn activate_tab(&self, tab_id: TabId) -> Result<()> {
        self.activated
            .lock()
            .map_err(|_| anyhow!("memory sink lock poisoned"))?
            .push(tab_id);
        Ok(())
    }
}
