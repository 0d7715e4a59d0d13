use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use crate::host::protocol::HostEvent;

#[derive(Debug, Clone)]
pub enum Event {
    Host(HostEvent),
    /// A line that is not a valid host event
    Malformed { line: String, error: String },
    /// Poll timer fired
    Tick,
    /// Input reached end of file or failed
    Closed,
}

pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Merge host events read from `input` with a poll timer.
    ///
    /// The first tick fires immediately so records restored from disk are
    /// refreshed on startup.
    pub fn new<R>(input: R, poll_interval: Duration) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut lines = input.lines();
            let mut poll_timer = tokio::time::interval(poll_interval);
            poll_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    line = lines.next_line() => {
                        let event = match line {
                            Ok(Some(line)) if line.trim().is_empty() => continue,
                            Ok(Some(line)) => match serde_json::from_str::<HostEvent>(&line) {
                                Ok(event) => Event::Host(event),
                                Err(e) => Event::Malformed { line, error: e.to_string() },
                            },
                            Ok(None) | Err(_) => {
                                let _ = tx.send(Event::Closed);
                                break;
                            }
                        };
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    _ = poll_timer.tick() => {
                        if tx.send(Event::Tick).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        EventHandler { rx }
    }

    pub async fn next(&mut self) -> Event {
        self.rx.recv().await.unwrap_or(Event::Closed)
    }
}
