//! Poll service: creation, snapshots, voting, closing, and live fan-out.
//!
//! DESIGN
//! ======
//! Every operation takes an explicit `now` so lifecycle rules can be tested
//! without sleeping. Handlers pass `OffsetDateTime::now_utc()`.
//!
//! Mutations and their broadcasts happen under the same write lock, so each
//! subscriber sees updates in the order they were applied.

use protocol::{OptionCounts, PollSnapshot, PollUpdate};
use rand::Rng;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::{AppState, PollState, format_timestamp};

const POLL_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CLOSED_BY_CREATOR: &str = "Poll closed by creator";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("Question and at least one option required")]
    InvalidInput,
    #[error("Poll not found or has expired")]
    NotFound,
    #[error("Voting period has ended")]
    VotingEnded,
    #[error("Poll is closed")]
    Closed,
    #[error("Invalid option")]
    InvalidOption,
    #[error("You have already voted")]
    AlreadyVoted,
    #[error("Only the creator can close this poll")]
    NotCreator,
}

// =============================================================================
// IDS
// =============================================================================

/// Generate a poll id of `len` characters from `A-Z0-9`, retrying until it
/// does not collide with `taken`.
pub fn generate_poll_id<R: Rng + ?Sized>(rng: &mut R, len: usize, taken: impl Fn(&str) -> bool) -> String {
    loop {
        let id: String = (0..len)
            .map(|_| char::from(POLL_ID_ALPHABET[rng.random_range(0..POLL_ID_ALPHABET.len())]))
            .collect();
        if !taken(&id) {
            return id;
        }
    }
}

/// Mint a server-side anonymous id: `anon_` plus 12 hex characters.
#[must_use]
pub fn generate_anonymous_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("anon_{}", &hex[..12])
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Create a poll owned by `creator` and return its id.
///
/// The question and options are trimmed; blank options are dropped and
/// duplicate labels collapse to the first occurrence.
///
/// # Errors
///
/// Returns [`PollError::InvalidInput`] for an empty question or no options.
pub async fn create_poll(
    state: &AppState,
    question: &str,
    options: &[String],
    creator: &str,
    now: OffsetDateTime,
) -> Result<String, PollError> {
    let question = question.trim();
    let labels = options.iter().map(|o| o.trim()).filter(|o| !o.is_empty());
    let options = OptionCounts::from_labels(labels);
    if question.is_empty() || options.is_empty() {
        return Err(PollError::InvalidInput);
    }

    let mut polls = state.polls.write().await;
    let poll_id = generate_poll_id(&mut rand::rng(), state.config.id_length, |id| polls.contains_key(id));
    let poll = PollState::new(question.to_owned(), options, creator.to_owned(), now, &state.config);
    info!(%poll_id, %creator, option_count = poll.options.len(), "poll created");
    polls.insert(poll_id.clone(), poll);
    Ok(poll_id)
}

/// Read a poll snapshot as seen by `viewer`.
///
/// # Errors
///
/// Returns [`PollError::NotFound`] for unknown or evicted polls.
pub async fn get_poll(
    state: &AppState,
    poll_id: &str,
    viewer: Option<&str>,
    now: OffsetDateTime,
) -> Result<PollSnapshot, PollError> {
    let polls = state.polls.read().await;
    let poll = polls.get(poll_id).ok_or(PollError::NotFound)?;
    Ok(poll.snapshot(viewer, now))
}

/// Record one vote and broadcast the new tallies.
///
/// Checks run in order: voting window, closed flag, option validity,
/// duplicate voter. A vote after the window also marks the poll closed.
///
/// # Errors
///
/// See [`PollError`]; no state changes on error except the closed flag.
pub async fn vote(
    state: &AppState,
    poll_id: &str,
    option: &str,
    anon_id: &str,
    now: OffsetDateTime,
) -> Result<(), PollError> {
    let mut polls = state.polls.write().await;
    let poll = polls.get_mut(poll_id).ok_or(PollError::NotFound)?;

    if now >= poll.voting_ends_at {
        poll.is_open = false;
        return Err(PollError::VotingEnded);
    }
    if !poll.is_open {
        return Err(PollError::Closed);
    }
    if !poll.options.contains(option) {
        return Err(PollError::InvalidOption);
    }
    if poll.voted.contains(anon_id) {
        return Err(PollError::AlreadyVoted);
    }

    poll.options.increment(option);
    poll.voted.insert(anon_id.to_owned());
    info!(%poll_id, %option, total = poll.options.total(), "vote recorded");

    let update = poll.update(now);
    broadcast(poll_id, poll, &update);
    Ok(())
}

/// Close a poll on behalf of its creator and notify subscribers.
///
/// Closing is idempotent for the creator.
///
/// # Errors
///
/// Returns [`PollError::NotFound`] or [`PollError::NotCreator`].
pub async fn close_poll(state: &AppState, poll_id: &str, anon_id: &str) -> Result<(), PollError> {
    let mut polls = state.polls.write().await;
    let poll = polls.get_mut(poll_id).ok_or(PollError::NotFound)?;
    if poll.creator != anon_id {
        return Err(PollError::NotCreator);
    }

    poll.is_open = false;
    info!(%poll_id, "poll closed by creator");

    let update = PollUpdate {
        question: poll.question.clone(),
        options: poll.options.clone(),
        is_open: false,
        voting_ends_at: None,
        message: Some(CLOSED_BY_CREATOR.to_owned()),
    };
    broadcast(poll_id, poll, &update);
    Ok(())
}

// =============================================================================
// SUBSCRIPTIONS
// =============================================================================

/// Register a live subscriber and return the greeting snapshot it should
/// receive first.
///
/// # Errors
///
/// Returns [`PollError::NotFound`] when the poll does not exist.
pub async fn subscribe(
    state: &AppState,
    poll_id: &str,
    subscriber_id: Uuid,
    tx: mpsc::Sender<PollUpdate>,
    now: OffsetDateTime,
) -> Result<PollUpdate, PollError> {
    let mut polls = state.polls.write().await;
    let poll = polls.get_mut(poll_id).ok_or(PollError::NotFound)?;
    poll.subscribers.insert(subscriber_id, tx);
    info!(%poll_id, %subscriber_id, subscribers = poll.subscribers.len(), "subscriber joined");

    let mut greeting = poll.update(now);
    greeting.voting_ends_at = Some(format_timestamp(poll.voting_ends_at));
    Ok(greeting)
}

/// Remove a subscriber. Unknown polls or ids are ignored.
pub async fn unsubscribe(state: &AppState, poll_id: &str, subscriber_id: Uuid) {
    let mut polls = state.polls.write().await;
    if let Some(poll) = polls.get_mut(poll_id) {
        if poll.subscribers.remove(&subscriber_id).is_some() {
            info!(%poll_id, %subscriber_id, subscribers = poll.subscribers.len(), "subscriber left");
        }
    }
}

/// Fan an update out to every subscriber of `poll`. Subscribers whose queue
/// is closed or full are dropped.
fn broadcast(poll_id: &str, poll: &mut PollState, update: &PollUpdate) {
    poll.subscribers.retain(|subscriber_id, tx| match tx.try_send(update.clone()) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!(%poll_id, %subscriber_id, "subscriber queue full; dropping subscriber");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    });
}

#[cfg(test)]
#[path = "poll_test.rs"]
mod tests;
