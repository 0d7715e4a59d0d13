pub mod sink;

pub use sink::{JsonLinesSink, LogSink, MemorySink, NotificationSink};

use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::status::TabId;
use crate::store::{ChangeFeed, StoreChange};

const NEW_COMMENT_MESSAGE: &str = "New comment";

/// Identifies a notification as `TabID:<tab>:<key>`.
///
/// The key is a status label or a comment count, so re-raising the same
/// status for the same tab replaces the earlier notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationId {
    pub tab_id: TabId,
    pub key: String,
}

impl NotificationId {
    pub fn new(tab_id: TabId, key: impl Into<String>) -> Self {
        Self {
            tab_id,
            key: key.into(),
        }
    }

    /// Parse an id produced by `Display`
    pub fn parse(id: &str) -> Option<Self> {
        let rest = id.strip_prefix("TabID:")?;
        let (tab, key) = rest.split_once(':')?;
        let tab_id = tab.parse().ok()?;
        Some(Self::new(tab_id, key))
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TabID:{}:{}", self.tab_id, self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
}

/// Decide which notifications a store write raises.
///
/// - removals raise nothing
/// - a write leaving status and comment count unchanged raises nothing
/// - a status change to anything but `Unknown` raises a status notification;
///   an insert counts as a status change
/// - a comment count change raises a "New comment" notification, but only
///   when there was a previous value. An insert never does, whatever its count.
pub fn notifications_for(change: &StoreChange) -> Vec<Notification> {
    let Some(new) = &change.new else {
        return Vec::new();
    };

    if let Some(old) = &change.old {
        if old.status == new.status && old.comments_count == new.comments_count {
            return Vec::new();
        }
    }

    let mut notifications = Vec::new();

    let status_changed = change.old.as_ref().map_or(true, |old| old.status != new.status);
    if status_changed && !new.status.is_unknown() {
        notifications.push(Notification {
            id: NotificationId::new(new.tab_id, new.status.label()),
            title: new.title.clone(),
            message: new.status.label().to_string(),
        });
    }

    if let Some(old) = &change.old {
        if old.comments_count != new.comments_count {
            notifications.push(Notification {
                id: NotificationId::new(new.tab_id, new.comments_count.to_string()),
                title: new.title.clone(),
                message: NEW_COMMENT_MESSAGE.to_string(),
            });
        }
    }

    notifications
}

/// Watches the store's change feed and delivers notifications to a sink
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Deliver the notifications for one change, returning how many were sent
    pub fn handle(&self, change: &StoreChange) -> usize {
        let notifications = notifications_for(change);
        let mut delivered = 0;
        for notification in &notifications {
            match self.sink.deliver(notification) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(id = %notification.id, "failed to deliver notification: {:#}", e),
            }
        }
        delivered
    }

    /// Run until the store's change feed closes or `shutdown` fires.
    ///
    /// On shutdown, changes already queued on the feed are still delivered.
    pub async fn run(self, mut changes: ChangeFeed, mut shutdown: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                biased;
                received = changes.recv() => match received {
                    Some(change) => {
                        let delivered = self.handle(&change);
                        debug!(id = change.id, delivered, "processed store change");
                    }
                    None => return,
                },
                _ = &mut shutdown => break,
            }
        }

        // Only Empty or Disconnected end the drain; the feed never drops changes
        while let Ok(change) = changes.try_recv() {
            self.handle(&change);
        }
    }

    pub fn spawn(self, changes: ChangeFeed) -> NotifierHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        NotifierHandle {
            shutdown: shutdown_tx,
            join: tokio::spawn(self.run(changes, shutdown_rx)),
        }
    }
}

/// Running notifier task
pub struct NotifierHandle {
    shutdown: oneshot::Sender<()>,
    join: tokio::task::JoinHandle<()>,
}

impl NotifierHandle {
    /// Deliver whatever is still queued, then stop
    pub async fn shutdown(self) -> Result<()> {
        // Err means the task already ended
        let _ = self.shutdown.send(());
        self.join.await.context("Notifier task panicked")
    }
}
