//! Cleanup service: background eviction of expired polls.
//!
//! DESIGN
//! ======
//! A background task sweeps the poll map once per cleanup interval and drops
//! every poll whose retention window has passed. Dropping a poll drops its
//! subscriber senders, which ends each subscriber's websocket loop.

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::state::AppState;

/// Spawn the background cleanup task. Returns a handle for shutdown.
pub fn spawn_cleanup_task(state: AppState) -> JoinHandle<()> {
    let interval = state.config.cleanup_interval;
    info!(interval_secs = interval.as_secs(), "poll cleanup configured");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            cleanup_expired_polls(&state, OffsetDateTime::now_utc()).await;
        }
    })
}

/// Remove every poll that expired before `now`. Returns the evicted ids.
pub async fn cleanup_expired_polls(state: &AppState, now: OffsetDateTime) -> Vec<String> {
    let mut polls = state.polls.write().await;
    let expired: Vec<String> = polls
        .iter()
        .filter(|(_, poll)| poll.is_expired_at(now))
        .map(|(poll_id, _)| poll_id.clone())
        .collect();

    for poll_id in &expired {
        if let Some(poll) = polls.remove(poll_id) {
            info!(%poll_id, subscribers = poll.subscribers.len(), "poll expired");
        }
    }
    expired
}

#[cfg(test)]
#[path = "cleanup_test.rs"]
mod tests;
