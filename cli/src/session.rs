//! Client session: the state behind one user's poll screen.
//!
//! DESIGN
//! ======
//! `PollSession` owns the anonymous identity, the currently loaded poll, its
//! last snapshot, and the live subscription. Every public operation is a UI
//! callback: it performs its request, then tells the [`View`] what to show.
//! Failures never escape: they are logged and surfaced via `View::alert`,
//! and the return value only says whether the action went through.
//!
//! Live updates arrive on the subscription task and are applied here, on the
//! session's own task, so the snapshot has a single writer.

use protocol::{PollSnapshot, PollUpdate};
use tracing::{info, warn};

use crate::api::PollApi;
use crate::error::ClientError;
use crate::live::{self, Backoff, LiveEvent, LiveHandle, LiveStatus};
use crate::render::PollScreen;
use crate::view::View;

pub const MSG_CREATE_INPUT_REQUIRED: &str = "Question and at least one option required.";
pub const MSG_NO_POLL_ID: &str = "Server did not return a poll ID – check backend";
pub const MSG_BACKEND_UNREACHABLE: &str = "Cannot reach backend. Check if server is running.";
pub const MSG_BAD_RESPONSE: &str = "Backend sent an unexpected response.";
pub const MSG_INVALID_POLL_ID: &str = "Enter a valid poll ID (at least 4 characters)";
pub const MSG_LOAD_FAILED: &str = "Cannot load poll – check ID or server.";
pub const MSG_NO_POLL_LOADED: &str = "Load a poll first.";
pub const MSG_VOTING_CLOSED: &str = "Voting is closed for this poll.";
pub const MSG_NOT_CREATOR: &str = "Only the creator can close this poll.";

const MIN_POLL_ID_LEN: usize = 4;

/// Split newline-separated option input: trim each line, drop blanks.
#[must_use]
pub fn parse_options(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Normalize typed poll-id input. `None` when too short to be an id.
#[must_use]
pub fn normalize_poll_id(raw: &str) -> Option<String> {
    let id = raw.trim().to_uppercase();
    (id.chars().count() >= MIN_POLL_ID_LEN).then_some(id)
}

/// Alert text for a failed request.
fn alert_message(err: &ClientError) -> String {
    match err {
        ClientError::Server { detail, .. } => detail.clone(),
        ClientError::MissingPollId => MSG_NO_POLL_ID.to_owned(),
        err if err.is_transport() => MSG_BACKEND_UNREACHABLE.to_owned(),
        _ => MSG_BAD_RESPONSE.to_owned(),
    }
}

pub struct PollSession<V: View> {
    api: PollApi,
    anon_id: String,
    view: V,
    current_poll_id: Option<String>,
    snapshot: Option<PollSnapshot>,
    live: Option<LiveHandle>,
    live_enabled: bool,
    backoff: Backoff,
}

impl<V: View> PollSession<V> {
    /// New session without live updates.
    #[must_use]
    pub fn new(api: PollApi, anon_id: String, view: V) -> Self {
        info!(%anon_id, "session started");
        Self {
            api,
            anon_id,
            view,
            current_poll_id: None,
            snapshot: None,
            live: None,
            live_enabled: false,
            backoff: Backoff::default(),
        }
    }

    /// Subscribe to live updates whenever a poll is loaded.
    #[must_use]
    pub fn with_live_updates(mut self, enabled: bool) -> Self {
        self.live_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn anon_id(&self) -> &str {
        &self.anon_id
    }

    #[must_use]
    pub fn current_poll_id(&self) -> Option<&str> {
        self.current_poll_id.as_deref()
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<&PollSnapshot> {
        self.snapshot.as_ref()
    }

    #[must_use]
    pub fn view(&self) -> &V {
        &self.view
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    /// Share link for the loaded poll.
    #[must_use]
    pub fn share_link(&self) -> Option<String> {
        self.current_poll_id.as_deref().map(|id| self.api.share_link(id).to_string())
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    /// Create a poll from raw form input and load it.
    ///
    /// `options_raw` holds one option per line. Returns the new poll id.
    pub async fn create_poll(&mut self, question_raw: &str, options_raw: &str) -> Option<String> {
        let question = question_raw.trim();
        let options = parse_options(options_raw);
        if question.is_empty() || options.is_empty() {
            self.view.alert(MSG_CREATE_INPUT_REQUIRED);
            return None;
        }

        self.view.set_busy(true);
        info!(option_count = options.len(), "create: sending request");
        let created = match self.api.create_poll(&self.anon_id, question, &options).await {
            Ok(poll_id) => {
                info!(%poll_id, "create: success, loading poll");
                self.load_poll(&poll_id).await;
                Some(poll_id)
            }
            Err(e) => {
                warn!(error = %e, "create: failed");
                self.view.alert(&alert_message(&e));
                None
            }
        };
        self.view.set_busy(false);
        created
    }

    // =========================================================================
    // LOAD
    // =========================================================================

    /// Load a poll from typed input (trimmed, uppercased, at least 4 chars).
    pub async fn load_from_input(&mut self, raw: &str) -> bool {
        let Some(poll_id) = normalize_poll_id(raw) else {
            self.view.alert(MSG_INVALID_POLL_ID);
            return false;
        };
        self.load_poll(&poll_id).await
    }

    /// Fetch and show a poll, then (re)start its live subscription.
    ///
    /// On failure the view returns to the create screen.
    pub async fn load_poll(&mut self, poll_id: &str) -> bool {
        info!(%poll_id, "load: starting");
        self.current_poll_id = Some(poll_id.to_owned());

        match self.api.get_poll(poll_id, &self.anon_id).await {
            Ok(snapshot) => {
                self.view.show_poll(&PollScreen::from_snapshot(poll_id, &snapshot));
                self.snapshot = Some(snapshot);
                self.view.show_share_link(self.api.share_link(poll_id).as_str());
                self.live = self
                    .live_enabled
                    .then(|| live::subscribe_with(self.api.ws_url(poll_id), self.backoff));
                true
            }
            Err(e) => {
                warn!(%poll_id, error = %e, "load: failed");
                self.current_poll_id = None;
                self.snapshot = None;
                self.live = None;
                self.view.alert(MSG_LOAD_FAILED);
                self.view.show_create();
                false
            }
        }
    }

    /// Re-fetch the loaded poll without touching the live subscription.
    async fn refresh(&mut self) {
        let Some(poll_id) = self.current_poll_id.clone() else {
            return;
        };
        match self.api.get_poll(&poll_id, &self.anon_id).await {
            Ok(snapshot) => {
                self.view.update_poll(&PollScreen::from_snapshot(&poll_id, &snapshot));
                self.snapshot = Some(snapshot);
            }
            Err(e) => warn!(%poll_id, error = %e, "refresh: failed"),
        }
    }

    // =========================================================================
    // VOTE / CLOSE
    // =========================================================================

    /// Vote for `option` on the loaded poll.
    pub async fn vote(&mut self, option: &str) -> bool {
        let (Some(poll_id), Some(snapshot)) = (self.current_poll_id.clone(), self.snapshot.as_ref()) else {
            self.view.alert(MSG_NO_POLL_LOADED);
            return false;
        };
        if !snapshot.is_open {
            self.view.alert(MSG_VOTING_CLOSED);
            return false;
        }
        if !snapshot.options.contains(option) {
            self.view.alert(&format!("Unknown option: {option}"));
            return false;
        }

        match self.api.vote(&poll_id, option, &self.anon_id).await {
            Ok(message) => {
                info!(%poll_id, %option, %message, "vote: accepted");
                if self.live.is_none() {
                    self.refresh().await;
                }
                true
            }
            Err(e) => {
                warn!(%poll_id, error = %e, "vote: failed");
                self.view.alert(&alert_message(&e));
                false
            }
        }
    }

    /// Close the loaded poll. Only its creator may do this.
    pub async fn close_poll(&mut self) -> bool {
        let (Some(poll_id), Some(snapshot)) = (self.current_poll_id.clone(), self.snapshot.as_ref()) else {
            self.view.alert(MSG_NO_POLL_LOADED);
            return false;
        };
        if !snapshot.is_creator {
            self.view.alert(MSG_NOT_CREATOR);
            return false;
        }

        match self.api.close_poll(&poll_id, &self.anon_id).await {
            Ok(message) => {
                info!(%poll_id, %message, "close: accepted");
                if self.live.is_none() {
                    self.refresh().await;
                }
                true
            }
            Err(e) => {
                warn!(%poll_id, error = %e, "close: failed");
                self.view.alert(&alert_message(&e));
                false
            }
        }
    }

    // =========================================================================
    // LIVE
    // =========================================================================

    /// Merge a pushed update into the snapshot and redraw.
    pub fn apply_update(&mut self, update: PollUpdate) {
        let Some(poll_id) = self.current_poll_id.clone() else {
            return;
        };
        let snapshot = self.snapshot.get_or_insert_with(PollSnapshot::default);
        if !update.question.is_empty() {
            snapshot.question = update.question;
        }
        snapshot.options = update.options;
        snapshot.is_open = update.is_open;
        if let Some(ends_at) = update.voting_ends_at {
            snapshot.voting_ends_at = Some(ends_at);
        }

        self.view.update_poll(&PollScreen::from_snapshot(&poll_id, snapshot));
        if let Some(message) = update.message {
            self.view.alert(&message);
        }
    }

    /// Apply one live event. Returns `false` once the subscription has ended.
    pub fn apply_live_event(&mut self, event: LiveEvent) -> bool {
        match event {
            LiveEvent::Update(update) => {
                self.apply_update(update);
                true
            }
            LiveEvent::Status(status) => {
                self.view.set_live_status(status);
                if status == LiveStatus::Ended {
                    self.live = None;
                    return false;
                }
                true
            }
        }
    }

    /// Next event from the live subscription, if one is running.
    pub async fn next_live_event(&mut self) -> Option<LiveEvent> {
        self.live.as_mut()?.recv().await
    }

    /// Apply live events until the subscription ends.
    pub async fn run_live(&mut self) {
        while let Some(event) = self.next_live_event().await {
            if !self.apply_live_event(event) {
                break;
            }
        }
    }

    pub fn stop_live(&mut self) {
        self.live = None;
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
