//! Live-update subscription for one poll.
//!
//! A spawned task owns the websocket. It connects, forwards every pushed
//! [`PollUpdate`] as a [`LiveEvent`] over an mpsc channel, and reconnects
//! with exponential backoff when the connection drops. A policy close
//! (1008: poll not found or expired) ends the subscription for good.
//!
//! ERROR HANDLING
//! ==============
//! Transport and parse failures are logged and absorbed by the reconnect
//! loop; the consumer only ever sees status transitions and updates.

use std::time::Duration;

use futures_util::StreamExt;
use protocol::{POLICY_VIOLATION_CLOSE_CODE, PollUpdate};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::ClientError;

pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
pub const MAX_BACKOFF: Duration = Duration::from_secs(10);
const EVENT_QUEUE: usize = 64;

/// Connection state of a live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveStatus {
    Connecting,
    Connected,
    /// Dropped; a reconnect is scheduled.
    Disconnected,
    /// The server no longer knows the poll; no further reconnects.
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    Status(LiveStatus),
    Update(PollUpdate),
}

/// Reconnect pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { initial: INITIAL_BACKOFF, max: MAX_BACKOFF }
    }
}

impl Backoff {
    /// Delay after `current`: doubled, capped at `max`.
    #[must_use]
    pub fn next(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

/// Handle to a running subscription. Dropping it stops the task.
#[derive(Debug)]
pub struct LiveHandle {
    events: mpsc::Receiver<LiveEvent>,
    task: JoinHandle<()>,
}

impl LiveHandle {
    /// Next event, or `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<LiveEvent> {
        self.events.recv().await
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for LiveHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start a subscription against `url` with default backoff.
#[must_use]
pub fn subscribe(url: Url) -> LiveHandle {
    subscribe_with(url, Backoff::default())
}

/// Start a subscription with explicit reconnect pacing.
#[must_use]
pub fn subscribe_with(url: Url, backoff: Backoff) -> LiveHandle {
    let (tx, events) = mpsc::channel(EVENT_QUEUE);
    let task = tokio::spawn(live_loop(url, tx, backoff));
    LiveHandle { events, task }
}

/// Why a single connection ended.
enum SessionEnd {
    /// Server closed with a policy violation: the poll is gone.
    PollGone,
    /// Consumer dropped the receiver.
    ReceiverGone,
    /// Socket closed or failed after connecting.
    Dropped,
}

/// Main connection loop with reconnect logic.
async fn live_loop(url: Url, tx: mpsc::Sender<LiveEvent>, backoff: Backoff) {
    let mut delay = backoff.initial;

    loop {
        if tx.send(LiveEvent::Status(LiveStatus::Connecting)).await.is_err() {
            return;
        }

        match connect_and_run(&url, &tx).await {
            Ok(SessionEnd::PollGone) => {
                info!(%url, "live: poll no longer available");
                let _ = tx.send(LiveEvent::Status(LiveStatus::Ended)).await;
                return;
            }
            Ok(SessionEnd::ReceiverGone) => return,
            Ok(SessionEnd::Dropped) => {
                debug!(%url, "live: connection dropped");
                delay = backoff.initial;
            }
            Err(e) => {
                warn!(%url, error = %e, "live: connection failed");
            }
        }

        if tx.send(LiveEvent::Status(LiveStatus::Disconnected)).await.is_err() {
            return;
        }

        // Exponential backoff before reconnect.
        tokio::time::sleep(delay).await;
        delay = backoff.next(delay);
    }
}

/// Connect and forward updates until the socket ends.
async fn connect_and_run(url: &Url, tx: &mpsc::Sender<LiveEvent>) -> Result<SessionEnd, ClientError> {
    let (mut stream, _) = connect_async(url.as_str()).await?;
    info!(%url, "live: connected");
    if tx.send(LiveEvent::Status(LiveStatus::Connected)).await.is_err() {
        return Ok(SessionEnd::ReceiverGone);
    }

    while let Some(message) = stream.next().await {
        match message? {
            Message::Text(text) => match serde_json::from_str::<PollUpdate>(text.as_str()) {
                Ok(update) => {
                    if tx.send(LiveEvent::Update(update)).await.is_err() {
                        return Ok(SessionEnd::ReceiverGone);
                    }
                }
                Err(e) => warn!(error = %e, "live: ignoring malformed update"),
            },
            Message::Close(Some(frame)) if u16::from(frame.code) == POLICY_VIOLATION_CLOSE_CODE => {
                return Ok(SessionEnd::PollGone);
            }
            Message::Close(_) => return Ok(SessionEnd::Dropped),
            _ => {}
        }
    }
    Ok(SessionEnd::Dropped)
}

#[cfg(test)]
#[path = "live_test.rs"]
mod tests;
