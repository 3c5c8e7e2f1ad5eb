use super::*;
use crate::test_support::{spawn_backend, spawn_stub};
use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::post;
use protocol::OptionCounts;
use std::time::Duration;
use tokio::time::timeout;

/// What the session asked the view to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Alert(String),
    ShowCreate,
    ShowPoll(String),
    UpdatePoll(String),
    Busy(bool),
    ShareLink(String),
    Live(LiveStatus),
}

#[derive(Debug, Default)]
struct RecordingView {
    calls: Vec<Call>,
}

impl RecordingView {
    fn alerts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Alert(message) => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl View for RecordingView {
    fn alert(&mut self, message: &str) {
        self.calls.push(Call::Alert(message.to_owned()));
    }

    fn show_create(&mut self) {
        self.calls.push(Call::ShowCreate);
    }

    fn show_poll(&mut self, screen: &PollScreen) {
        self.calls.push(Call::ShowPoll(screen.poll_id.clone()));
    }

    fn update_poll(&mut self, screen: &PollScreen) {
        self.calls.push(Call::UpdatePoll(screen.poll_id.clone()));
    }

    fn set_busy(&mut self, busy: bool) {
        self.calls.push(Call::Busy(busy));
    }

    fn show_share_link(&mut self, url: &str) {
        self.calls.push(Call::ShareLink(url.to_owned()));
    }

    fn set_live_status(&mut self, status: LiveStatus) {
        self.calls.push(Call::Live(status));
    }
}

fn session(api: PollApi, anon_id: &str) -> PollSession<RecordingView> {
    PollSession::new(api, anon_id.to_owned(), RecordingView::default())
}

fn offline_session() -> PollSession<RecordingView> {
    session(PollApi::new("http://127.0.0.1:9").unwrap(), "anon_offline")
}

// =============================================================================
// INPUT PARSING
// =============================================================================

#[test]
fn options_split_on_lines_and_drop_blanks() {
    assert_eq!(parse_options("  Pizza \n\n Sushi\r\n   \nTacos"), vec!["Pizza", "Sushi", "Tacos"]);
    assert!(parse_options(" \n \n").is_empty());
}

#[test]
fn poll_id_input_is_trimmed_and_uppercased() {
    assert_eq!(normalize_poll_id("  ab12cd "), Some("AB12CD".to_owned()));
    assert_eq!(normalize_poll_id("abcd"), Some("ABCD".to_owned()));
    assert_eq!(normalize_poll_id(" ab "), None);
    assert_eq!(normalize_poll_id(""), None);
}

// =============================================================================
// LOCAL VALIDATION (no network)
// =============================================================================

#[tokio::test]
async fn create_requires_question_and_option() {
    let mut session = offline_session();
    assert_eq!(session.create_poll("   ", "A\nB").await, None);
    assert_eq!(session.create_poll("Lunch?", " \n ").await, None);
    assert_eq!(session.view().calls, vec![
        Call::Alert(MSG_CREATE_INPUT_REQUIRED.to_owned()),
        Call::Alert(MSG_CREATE_INPUT_REQUIRED.to_owned()),
    ]);
}

#[tokio::test]
async fn short_poll_id_is_rejected_locally() {
    let mut session = offline_session();
    assert!(!session.load_from_input(" ab ").await);
    assert_eq!(session.view().calls, vec![Call::Alert(MSG_INVALID_POLL_ID.to_owned())]);
}

#[tokio::test]
async fn vote_and_close_need_a_loaded_poll() {
    let mut session = offline_session();
    assert!(!session.vote("A").await);
    assert!(!session.close_poll().await);
    assert_eq!(session.view().alerts(), vec![MSG_NO_POLL_LOADED, MSG_NO_POLL_LOADED]);
}

// =============================================================================
// AGAINST THE REAL BACKEND
// =============================================================================

#[tokio::test]
async fn create_loads_the_new_poll() {
    let backend = spawn_backend().await;
    let mut session = session(backend.api.clone(), "anon_creator");

    let poll_id = session.create_poll(" Lunch? ", "Pizza\n\nSushi\n").await.expect("poll created");

    assert_eq!(session.current_poll_id(), Some(poll_id.as_str()));
    let snapshot = session.snapshot().expect("snapshot loaded");
    assert_eq!(snapshot.question, "Lunch?");
    assert!(snapshot.is_creator);
    assert_eq!(snapshot.options.iter().map(|(label, _)| label).collect::<Vec<_>>(), vec!["Pizza", "Sushi"]);

    let share = backend.api.share_link(&poll_id).to_string();
    assert_eq!(session.share_link(), Some(share.clone()));
    assert_eq!(session.view().calls, vec![
        Call::Busy(true),
        Call::ShowPoll(poll_id.clone()),
        Call::ShareLink(share),
        Call::Busy(false),
    ]);
}

#[tokio::test]
async fn load_from_input_uppercases_before_fetching() {
    let backend = spawn_backend().await;
    let poll_id = backend.api.create_poll("anon_creator", "Q?", &["A".into()]).await.unwrap();

    let mut viewer = session(backend.api.clone(), "anon_viewer");
    assert!(viewer.load_from_input(&format!("  {}  ", poll_id.to_lowercase())).await);
    assert_eq!(viewer.current_poll_id(), Some(poll_id.as_str()));
    assert!(!viewer.snapshot().unwrap().is_creator);
}

#[tokio::test]
async fn unknown_poll_returns_to_create_screen() {
    let backend = spawn_backend().await;
    let mut session = session(backend.api.clone(), "anon_viewer");

    assert!(!session.load_poll("NOPE00").await);
    assert_eq!(session.current_poll_id(), None);
    assert_eq!(session.view().calls, vec![Call::Alert(MSG_LOAD_FAILED.to_owned()), Call::ShowCreate]);
}

#[tokio::test]
async fn vote_refreshes_counts_and_second_vote_shows_server_detail() {
    let backend = spawn_backend().await;
    let poll_id = backend.api.create_poll("anon_creator", "Q?", &["A".into(), "B".into()]).await.unwrap();

    let mut voter = session(backend.api.clone(), "anon_voter");
    assert!(voter.load_poll(&poll_id).await);
    assert!(voter.vote("B").await);
    assert_eq!(voter.snapshot().unwrap().options.get("B"), Some(1));
    assert!(voter.view().calls.contains(&Call::UpdatePoll(poll_id.clone())));

    assert!(!voter.vote("A").await);
    assert_eq!(voter.view().alerts(), vec!["You have already voted"]);
}

#[tokio::test]
async fn vote_rejects_unknown_option_before_sending() {
    let backend = spawn_backend().await;
    let poll_id = backend.api.create_poll("anon_creator", "Q?", &["A".into()]).await.unwrap();

    let mut voter = session(backend.api.clone(), "anon_voter");
    voter.load_poll(&poll_id).await;
    assert!(!voter.vote("Z").await);
    assert_eq!(voter.view().alerts(), vec!["Unknown option: Z"]);

    let snapshot = backend.api.get_poll(&poll_id, "anon_creator").await.unwrap();
    assert_eq!(snapshot.options.total(), 0);
}

#[tokio::test]
async fn only_creator_can_close() {
    let backend = spawn_backend().await;
    let poll_id = backend.api.create_poll("anon_creator", "Q?", &["A".into()]).await.unwrap();

    let mut voter = session(backend.api.clone(), "anon_voter");
    voter.load_poll(&poll_id).await;
    assert!(!voter.close_poll().await);
    assert_eq!(voter.view().alerts(), vec![MSG_NOT_CREATOR]);

    let mut creator = session(backend.api.clone(), "anon_creator");
    creator.load_poll(&poll_id).await;
    assert!(creator.close_poll().await);
    assert!(!creator.snapshot().unwrap().is_open);

    assert!(!creator.vote("A").await);
    assert_eq!(creator.view().alerts(), vec![MSG_VOTING_CLOSED]);
}

#[tokio::test]
async fn live_session_applies_pushed_close_with_message() {
    let backend = spawn_backend().await;
    let poll_id = backend.api.create_poll("anon_creator", "Q?", &["A".into()]).await.unwrap();

    let mut watcher = session(backend.api.clone(), "anon_watcher").with_live_updates(true);
    assert!(watcher.load_poll(&poll_id).await);
    assert!(watcher.is_live());

    // Wait for the greeting so the close happens after the subscription exists.
    loop {
        let event = timeout(Duration::from_secs(3), watcher.next_live_event()).await.unwrap().unwrap();
        let greeting = matches!(event, LiveEvent::Update(_));
        watcher.apply_live_event(event);
        if greeting {
            break;
        }
    }

    backend.api.close_poll(&poll_id, "anon_creator").await.unwrap();
    let event = timeout(Duration::from_secs(3), watcher.next_live_event()).await.unwrap().unwrap();
    assert!(watcher.apply_live_event(event));

    assert!(!watcher.snapshot().unwrap().is_open);
    assert_eq!(watcher.view().alerts(), vec!["Poll closed by creator"]);
}

// =============================================================================
// STUB BACKENDS
// =============================================================================

#[tokio::test]
async fn create_without_poll_id_alerts_backend_problem() {
    let api = spawn_stub(Router::new().route(
        "/api/polls",
        post(|| async { Json(serde_json::json!({ "ok": true })) }),
    ))
    .await;
    let mut session = session(api, "anon_creator");

    assert_eq!(session.create_poll("Q?", "A").await, None);
    assert_eq!(session.view().calls, vec![
        Call::Busy(true),
        Call::Alert(MSG_NO_POLL_ID.to_owned()),
        Call::Busy(false),
    ]);
}

#[tokio::test]
async fn create_error_detail_is_shown_verbatim() {
    let api = spawn_stub(Router::new().route(
        "/api/polls",
        post(|| async {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(serde_json::json!({ "detail": "Question too long" })))
        }),
    ))
    .await;
    let mut session = session(api, "anon_creator");

    assert_eq!(session.create_poll("Q?", "A").await, None);
    assert_eq!(session.view().alerts(), vec!["Question too long"]);
}

#[tokio::test]
async fn create_error_without_detail_shows_status() {
    let api = spawn_stub(Router::new().route("/api/polls", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }))).await;
    let mut session = session(api, "anon_creator");

    session.create_poll("Q?", "A").await;
    assert_eq!(session.view().alerts(), vec!["Server error 500"]);
}

#[tokio::test]
async fn undecodable_create_body_is_not_reported_as_unreachable() {
    let api = spawn_stub(Router::new().route("/api/polls", post(|| async { "<html>not json</html>" }))).await;
    let mut session = session(api, "anon_creator");

    assert_eq!(session.create_poll("Q?", "A").await, None);
    assert_eq!(session.view().alerts(), vec![MSG_BAD_RESPONSE]);
}

#[tokio::test]
async fn unreachable_backend_alerts_connectivity() {
    let mut session = offline_session();
    assert_eq!(session.create_poll("Q?", "A").await, None);
    assert_eq!(session.view().alerts(), vec![MSG_BACKEND_UNREACHABLE]);
}

// =============================================================================
// UPDATE MERGING
// =============================================================================

#[tokio::test]
async fn update_keeps_question_when_push_omits_it() {
    let backend = spawn_backend().await;
    let poll_id = backend.api.create_poll("anon_creator", "Lunch?", &["A".into()]).await.unwrap();
    let mut session = session(backend.api.clone(), "anon_viewer");
    session.load_poll(&poll_id).await;

    session.apply_update(PollUpdate {
        question: String::new(),
        options: [("A", 4)].into_iter().collect::<OptionCounts>(),
        is_open: true,
        voting_ends_at: None,
        message: None,
    });

    let snapshot = session.snapshot().unwrap();
    assert_eq!(snapshot.question, "Lunch?");
    assert_eq!(snapshot.options.get("A"), Some(4));
    assert!(snapshot.voting_ends_at.is_some());
    assert!(session.view().alerts().is_empty());
}

#[tokio::test]
async fn ended_status_drops_subscription() {
    let mut session = offline_session();
    assert!(session.apply_live_event(LiveEvent::Status(LiveStatus::Connecting)));
    assert!(!session.apply_live_event(LiveEvent::Status(LiveStatus::Ended)));
    assert!(!session.is_live());
    assert_eq!(session.view().calls, vec![Call::Live(LiveStatus::Connecting), Call::Live(LiveStatus::Ended)]);
}
