use super::*;
use std::collections::HashMap;

fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
    let env: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    ServerConfig::from_lookup(|key| env.get(key).cloned())
}

#[test]
fn empty_environment_uses_defaults() {
    let config = config_from(&[]);
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.polls, PollConfig::default());
}

#[test]
fn overrides_are_parsed() {
    let config = config_from(&[
        ("PORT", "8080"),
        ("POLL_VOTING_WINDOW_SECS", "60"),
        ("POLL_RETENTION_SECS", "120"),
        ("POLL_CLEANUP_INTERVAL_SECS", "5"),
        ("POLL_ID_LENGTH", "8"),
    ]);
    assert_eq!(config.port, 8080);
    assert_eq!(config.polls.voting_window, Duration::from_secs(60));
    assert_eq!(config.polls.retention, Duration::from_secs(120));
    assert_eq!(config.polls.cleanup_interval, Duration::from_secs(5));
    assert_eq!(config.polls.id_length, 8);
}

#[test]
fn invalid_values_fall_back_to_defaults() {
    let config = config_from(&[("PORT", "not-a-port"), ("POLL_ID_LENGTH", "-3")]);
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.polls.id_length, DEFAULT_POLL_ID_LENGTH);
}

#[test]
fn retention_never_shorter_than_voting_window() {
    let config = config_from(&[("POLL_VOTING_WINDOW_SECS", "600"), ("POLL_RETENTION_SECS", "10")]);
    assert_eq!(config.polls.retention, Duration::from_secs(600));
}

#[test]
fn id_length_has_a_floor() {
    let config = config_from(&[("POLL_ID_LENGTH", "2")]);
    assert_eq!(config.polls.id_length, MIN_POLL_ID_LENGTH);
}
