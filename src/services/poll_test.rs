use super::*;
use crate::state::test_helpers;
use std::time::Duration;
use tokio::time::timeout;

fn opts(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| (*s).to_owned()).collect()
}

#[test]
fn generated_ids_use_alphabet_and_length() {
    let mut rng = rand::rng();
    let id = generate_poll_id(&mut rng, 6, |_| false);
    assert_eq!(id.len(), 6);
    assert!(id.bytes().all(|b| POLL_ID_ALPHABET.contains(&b)));
}

#[test]
fn generated_ids_skip_taken_values() {
    let mut rng = rand::rng();
    let first = generate_poll_id(&mut rng, 4, |_| false);
    let second = generate_poll_id(&mut rng, 4, |id| id == first);
    assert_ne!(first, second);
}

#[test]
fn anonymous_ids_have_prefix_and_hex_suffix() {
    let id = generate_anonymous_id();
    let suffix = id.strip_prefix("anon_").expect("anon_ prefix");
    assert_eq!(suffix.len(), 12);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn create_poll_trims_and_dedupes_options() {
    let state = test_helpers::test_app_state();
    let now = OffsetDateTime::now_utc();
    let id = create_poll(&state, "  Lunch?  ", &opts(&[" Pizza ", "", "Sushi", "Pizza"]), "anon_a", now)
        .await
        .unwrap();

    let snapshot = get_poll(&state, &id, Some("anon_a"), now).await.unwrap();
    assert_eq!(snapshot.question, "Lunch?");
    assert_eq!(snapshot.options.iter().collect::<Vec<_>>(), vec![("Pizza", 0), ("Sushi", 0)]);
    assert!(snapshot.is_open);
    assert!(snapshot.is_creator);
}

#[tokio::test]
async fn create_poll_rejects_blank_input() {
    let state = test_helpers::test_app_state();
    let now = OffsetDateTime::now_utc();
    assert_eq!(create_poll(&state, "   ", &opts(&["A"]), "anon_a", now).await, Err(PollError::InvalidInput));
    assert_eq!(create_poll(&state, "Q", &opts(&["  ", ""]), "anon_a", now).await, Err(PollError::InvalidInput));
    assert!(state.polls.read().await.is_empty());
}

#[tokio::test]
async fn get_unknown_poll_is_not_found() {
    let state = test_helpers::test_app_state();
    let result = get_poll(&state, "NOPE00", None, OffsetDateTime::now_utc()).await;
    assert_eq!(result, Err(PollError::NotFound));
}

#[tokio::test]
async fn vote_increments_and_rejects_second_vote() {
    let state = test_helpers::test_app_state();
    let now = OffsetDateTime::now_utc();
    let id = test_helpers::seed_poll(&state, "anon_creator", &["Red", "Blue"], now).await;

    vote(&state, &id, "Blue", "anon_voter", now).await.unwrap();
    assert_eq!(vote(&state, &id, "Red", "anon_voter", now).await, Err(PollError::AlreadyVoted));

    let snapshot = get_poll(&state, &id, None, now).await.unwrap();
    assert_eq!(snapshot.options.get("Blue"), Some(1));
    assert_eq!(snapshot.options.get("Red"), Some(0));
}

#[tokio::test]
async fn vote_for_unknown_option_is_rejected() {
    let state = test_helpers::test_app_state();
    let now = OffsetDateTime::now_utc();
    let id = test_helpers::seed_poll(&state, "anon_creator", &["Red"], now).await;
    assert_eq!(vote(&state, &id, "Green", "anon_voter", now).await, Err(PollError::InvalidOption));
}

#[tokio::test]
async fn vote_after_window_closes_poll() {
    let state = test_helpers::test_app_state();
    let now = OffsetDateTime::now_utc();
    let id = test_helpers::seed_poll(&state, "anon_creator", &["Red"], now).await;
    let late = now + state.config.voting_window;

    assert_eq!(vote(&state, &id, "Red", "anon_voter", late).await, Err(PollError::VotingEnded));
    assert!(!state.polls.read().await[&id].is_open);
    assert_eq!(vote(&state, &id, "Red", "anon_voter", now).await, Err(PollError::Closed));
}

#[tokio::test]
async fn only_creator_can_close() {
    let state = test_helpers::test_app_state();
    let now = OffsetDateTime::now_utc();
    let id = test_helpers::seed_poll(&state, "anon_creator", &["Red"], now).await;

    assert_eq!(close_poll(&state, &id, "anon_other").await, Err(PollError::NotCreator));
    close_poll(&state, &id, "anon_creator").await.unwrap();
    assert_eq!(vote(&state, &id, "Red", "anon_voter", now).await, Err(PollError::Closed));
    assert_eq!(close_poll(&state, "MISSING", "anon_creator").await, Err(PollError::NotFound));
}

#[tokio::test]
async fn subscribers_receive_greeting_votes_and_close() {
    let state = test_helpers::test_app_state();
    let now = OffsetDateTime::now_utc();
    let id = test_helpers::seed_poll(&state, "anon_creator", &["Red", "Blue"], now).await;
    let (tx, mut rx) = mpsc::channel(8);

    let greeting = subscribe(&state, &id, Uuid::new_v4(), tx, now).await.unwrap();
    assert!(greeting.voting_ends_at.is_some());
    assert!(greeting.is_open);

    vote(&state, &id, "Red", "anon_voter", now).await.unwrap();
    let update = timeout(Duration::from_millis(200), rx.recv()).await.unwrap().unwrap();
    assert_eq!(update.options.get("Red"), Some(1));
    assert!(update.message.is_none());

    close_poll(&state, &id, "anon_creator").await.unwrap();
    let closed = timeout(Duration::from_millis(200), rx.recv()).await.unwrap().unwrap();
    assert!(!closed.is_open);
    assert_eq!(closed.message.as_deref(), Some("Poll closed by creator"));
}

#[tokio::test]
async fn closed_subscriber_is_dropped_on_broadcast() {
    let state = test_helpers::test_app_state();
    let now = OffsetDateTime::now_utc();
    let id = test_helpers::seed_poll(&state, "anon_creator", &["Red"], now).await;
    let (tx, rx) = mpsc::channel(8);
    subscribe(&state, &id, Uuid::new_v4(), tx, now).await.unwrap();
    drop(rx);

    vote(&state, &id, "Red", "anon_voter", now).await.unwrap();
    assert!(state.polls.read().await[&id].subscribers.is_empty());
}

#[tokio::test]
async fn unsubscribe_removes_subscriber() {
    let state = test_helpers::test_app_state();
    let now = OffsetDateTime::now_utc();
    let id = test_helpers::seed_poll(&state, "anon_creator", &["Red"], now).await;
    let subscriber_id = Uuid::new_v4();
    let (tx, _rx) = mpsc::channel(8);
    subscribe(&state, &id, subscriber_id, tx, now).await.unwrap();

    unsubscribe(&state, &id, subscriber_id).await;
    assert!(state.polls.read().await[&id].subscribers.is_empty());
    unsubscribe(&state, "MISSING", subscriber_id).await;
}

#[tokio::test]
async fn subscribe_unknown_poll_is_not_found() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = mpsc::channel(1);
    let result = subscribe(&state, "MISSING", Uuid::new_v4(), tx, OffsetDateTime::now_utc()).await;
    assert_eq!(result, Err(PollError::NotFound));
}
