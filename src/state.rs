//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the poll lifecycle config and a map of live polls. Each poll
//! owns its tallies, the set of anonymous ids that already voted, and the
//! websocket subscribers waiting for updates. Nothing is persisted: a poll
//! lives until the cleanup task evicts it after its retention window.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use protocol::{OptionCounts, PollSnapshot, PollUpdate};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::config::PollConfig;

// =============================================================================
// POLL STATE
// =============================================================================

/// Per-poll live state.
pub struct PollState {
    pub question: String,
    /// Tallies in creation order.
    pub options: OptionCounts,
    /// Anonymous ids that have already voted.
    pub voted: HashSet<String>,
    /// Anonymous id of the creator; only they may close the poll.
    pub creator: String,
    pub created_at: OffsetDateTime,
    pub voting_ends_at: OffsetDateTime,
    /// After this instant the poll is evicted.
    pub expires_at: OffsetDateTime,
    /// Cleared by a creator close or by a vote arriving after `voting_ends_at`.
    pub is_open: bool,
    /// Connected websocket subscribers: `subscriber_id` -> sender for outgoing updates.
    pub subscribers: HashMap<Uuid, mpsc::Sender<PollUpdate>>,
}

impl PollState {
    #[must_use]
    pub fn new(
        question: String,
        options: OptionCounts,
        creator: String,
        now: OffsetDateTime,
        config: &PollConfig,
    ) -> Self {
        Self {
            question,
            options,
            voted: HashSet::new(),
            creator,
            created_at: now,
            voting_ends_at: now + config.voting_window,
            expires_at: now + config.retention,
            is_open: true,
            subscribers: HashMap::new(),
        }
    }

    /// Open flag as seen by readers: closed polls and polls past their
    /// voting window both report closed.
    #[must_use]
    pub fn is_open_at(&self, now: OffsetDateTime) -> bool {
        self.is_open && now < self.voting_ends_at
    }

    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at < now
    }

    /// Full snapshot for `GET /api/polls/{id}`.
    #[must_use]
    pub fn snapshot(&self, viewer: Option<&str>, now: OffsetDateTime) -> PollSnapshot {
        PollSnapshot {
            question: self.question.clone(),
            options: self.options.clone(),
            is_open: self.is_open_at(now),
            created_at: Some(format_timestamp(self.created_at)),
            voting_ends_at: Some(format_timestamp(self.voting_ends_at)),
            results_visible_until: Some(format_timestamp(self.expires_at)),
            is_creator: viewer.is_some_and(|anon_id| anon_id == self.creator),
        }
    }

    /// Push payload for live subscribers.
    #[must_use]
    pub fn update(&self, now: OffsetDateTime) -> PollUpdate {
        PollUpdate {
            question: self.question.clone(),
            options: self.options.clone(),
            is_open: self.is_open_at(now),
            voting_ends_at: None,
            message: None,
        }
    }
}

/// RFC 3339 rendering used for every timestamp on the wire.
#[must_use]
pub fn format_timestamp(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.unix_timestamp().to_string())
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub polls: Arc<RwLock<HashMap<String, PollState>>>,
    pub config: PollConfig,
}

impl AppState {
    #[must_use]
    pub fn new(config: PollConfig) -> Self {
        Self { polls: Arc::new(RwLock::new(HashMap::new())), config }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
