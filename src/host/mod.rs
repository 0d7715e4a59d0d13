//! Long-running host process that the browser extension talks to.
//!
//! Browser events arrive as JSON lines on the input; notifications and tab
//! activation requests leave through the `NotificationSink`.

pub mod event;
pub mod protocol;

pub use protocol::{HostCommand, HostEvent};

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::github::PullRequestSource;
use crate::notify::{NotificationSink, Notifier};
use crate::poll::Poller;
use crate::store::StatusStore;
use crate::tabs::TabBinder;
use event::{Event, EventHandler};

/// Collaborators the host loop wires together
pub struct HostServices {
    pub store: Arc<StatusStore>,
    pub source: Arc<dyn PullRequestSource>,
    pub sink: Arc<dyn NotificationSink>,
    pub max_concurrent_fetches: usize,
}

/// Serve host events from `input` until it closes.
///
/// Navigation fetches and poll passes run as background tasks so a slow
/// request never holds up tab-close or click handling. At most one poll
/// pass runs at a time; a tick that arrives while one is running is skipped.
pub async fn run_host<R>(input: R, services: HostServices, poll_interval: Duration) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let HostServices {
        store,
        source,
        sink,
        max_concurrent_fetches,
    } = services;

    let notifier = Notifier::new(sink.clone()).spawn(store.subscribe());
    let binder = TabBinder::new(source.clone(), store.clone());
    let poller = Poller::new(source, store.clone()).with_max_concurrent(max_concurrent_fetches);

    let mut events = EventHandler::new(input, poll_interval);
    let mut navigations = JoinSet::new();
    let mut pending_poll: Option<JoinHandle<()>> = None;

    info!(interval = ?poll_interval, "host started");

    loop {
        match events.next().await {
            Event::Host(HostEvent::Navigated { tab_id, url }) => {
                let binder = binder.clone();
                navigations.spawn(async move {
                    if let Err(e) = binder.on_navigation(tab_id, &url).await {
                        warn!(tab_id, %url, "Failed to track pull request: {:#}", e);
                    }
                });
            }
            Event::Host(HostEvent::TabRemoved { tab_id }) => {
                if let Err(e) = binder.on_tab_removed(tab_id) {
                    warn!(tab_id, "Failed to forget closed tab: {:#}", e);
                }
            }
            Event::Host(HostEvent::NotificationClicked { notification_id }) => {
                match binder.on_notification_clicked(&notification_id) {
                    Some(tab_id) => {
                        if let Err(e) = sink.activate_tab(tab_id) {
                            warn!(tab_id, "Failed to activate tab: {:#}", e);
                        }
                    }
                    None => warn!(%notification_id, "Clicked notification has no tab id"),
                }
            }
            Event::Malformed { line, error } => {
                warn!(%line, "Ignoring malformed host event: {}", error);
            }
            Event::Tick => {
                let busy = pending_poll.as_ref().is_some_and(|h| !h.is_finished());
                if busy {
                    debug!("previous poll still running, skipping tick");
                } else {
                    let poller = poller.clone();
                    pending_poll = Some(tokio::spawn(async move {
                        if let Err(e) = poller.poll_once().await {
                            warn!("Poll failed: {:#}", e);
                        }
                    }));
                }
            }
            Event::Closed => break,
        }

        // Reap finished navigation tasks
        while navigations.try_join_next().is_some() {}
    }

    info!("input closed, shutting down");

    while navigations.join_next().await.is_some() {}
    if let Some(handle) = pending_poll {
        if let Err(e) = handle.await {
            warn!("Poll task panicked: {}", e);
        }
    }

    notifier.shutdown().await
}
