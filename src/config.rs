//! Server configuration parsed from environment variables.
//!
//! Every knob has a default, so an empty environment yields a working server:
//! - `PORT`: default 3000
//! - `POLL_VOTING_WINDOW_SECS`: default 86400 (24h)
//! - `POLL_RETENTION_SECS`: default 172800 (48h), never shorter than the voting window
//! - `POLL_CLEANUP_INTERVAL_SECS`: default 60
//! - `POLL_ID_LENGTH`: default 6, minimum 4
//! - `POLL_SUBSCRIBER_QUEUE`: default 64 buffered updates per websocket

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_VOTING_WINDOW_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_RETENTION_SECS: u64 = 48 * 60 * 60;
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_POLL_ID_LENGTH: usize = 6;
pub const MIN_POLL_ID_LENGTH: usize = 4;
pub const DEFAULT_SUBSCRIBER_QUEUE: usize = 64;

/// Poll lifecycle tuning shared by the services and the cleanup task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// How long a new poll accepts votes.
    pub voting_window: Duration,
    /// How long a poll (and its results) stays in memory after creation.
    pub retention: Duration,
    /// Period of the expiry sweep.
    pub cleanup_interval: Duration,
    /// Length of generated poll ids.
    pub id_length: usize,
    /// Per-subscriber update buffer.
    pub subscriber_queue: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            voting_window: Duration::from_secs(DEFAULT_VOTING_WINDOW_SECS),
            retention: Duration::from_secs(DEFAULT_RETENTION_SECS),
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            id_length: DEFAULT_POLL_ID_LENGTH,
            subscriber_queue: DEFAULT_SUBSCRIBER_QUEUE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub polls: PollConfig,
}

impl ServerConfig {
    /// Build typed config from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary key lookup. Unparseable values
    /// fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse = |key: &str, default: u64| -> u64 {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        let port = lookup("PORT")
            .and_then(|v| v.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let voting_window = Duration::from_secs(parse("POLL_VOTING_WINDOW_SECS", DEFAULT_VOTING_WINDOW_SECS));
        let retention = Duration::from_secs(parse("POLL_RETENTION_SECS", DEFAULT_RETENTION_SECS)).max(voting_window);
        let cleanup_interval =
            Duration::from_secs(parse("POLL_CLEANUP_INTERVAL_SECS", DEFAULT_CLEANUP_INTERVAL_SECS).max(1));
        let id_length = usize::try_from(parse("POLL_ID_LENGTH", DEFAULT_POLL_ID_LENGTH as u64))
            .unwrap_or(DEFAULT_POLL_ID_LENGTH)
            .max(MIN_POLL_ID_LENGTH);
        let subscriber_queue = usize::try_from(parse("POLL_SUBSCRIBER_QUEUE", DEFAULT_SUBSCRIBER_QUEUE as u64))
            .unwrap_or(DEFAULT_SUBSCRIBER_QUEUE)
            .max(1);

        Self {
            port,
            polls: PollConfig { voting_window, retention, cleanup_interval, id_length, subscriber_queue },
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
