//! WebSocket handler: live poll updates.
//!
//! DESIGN
//! ======
//! On upgrade, registers the socket as a subscriber of one poll and enters a
//! `select!` loop:
//! - Incoming client messages are ignored (clients may ping to keep alive)
//! - Updates from the poll service are serialized and forwarded as text
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → unknown poll: close with 1008 and stop
//! 2. Send greeting snapshot (carries `voting_ends_at`)
//! 3. Relay updates until the client leaves or the poll is evicted
//! 4. Unsubscribe

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use protocol::{POLICY_VIOLATION_CLOSE_CODE, POLL_NOT_FOUND_CLOSE_REASON, PollUpdate};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services;
use crate::state::AppState;

/// Close code used when a subscriber is dropped but the poll still exists;
/// clients treat it as retryable.
const TRY_AGAIN_CLOSE_CODE: u16 = 1013;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, Path(poll_id): Path<String>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state, poll_id))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, poll_id: String) {
    let subscriber_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<PollUpdate>(state.config.subscriber_queue);

    let now = OffsetDateTime::now_utc();
    let Ok(greeting) = services::poll::subscribe(&state, &poll_id, subscriber_id, tx, now).await else {
        info!(%poll_id, "ws: rejected subscriber for unknown poll");
        close_with(&mut socket, POLICY_VIOLATION_CLOSE_CODE, POLL_NOT_FOUND_CLOSE_REASON).await;
        return;
    };

    if send_update(&mut socket, &greeting).await.is_ok() {
        loop {
            tokio::select! {
                msg = socket.recv() => {
                    match msg {
                        Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    }
                }
                update = rx.recv() => {
                    let Some(update) = update else {
                        // Sender dropped: either the poll was evicted or we fell behind.
                        let evicted = !state.polls.read().await.contains_key(&poll_id);
                        if evicted {
                            close_with(&mut socket, POLICY_VIOLATION_CLOSE_CODE, POLL_NOT_FOUND_CLOSE_REASON).await;
                        } else {
                            close_with(&mut socket, TRY_AGAIN_CLOSE_CODE, "subscriber lagged").await;
                        }
                        break;
                    };
                    if send_update(&mut socket, &update).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    services::poll::unsubscribe(&state, &poll_id, subscriber_id).await;
    info!(%poll_id, %subscriber_id, "ws: subscriber disconnected");
}

async fn send_update(socket: &mut WebSocket, update: &PollUpdate) -> Result<(), ()> {
    let json = match serde_json::to_string(update) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize update");
            return Err(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

async fn close_with(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let frame = CloseFrame { code, reason: reason.into() };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
