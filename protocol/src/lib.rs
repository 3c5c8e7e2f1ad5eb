//! Shared JSON wire model for the polling API and live-update channel.
//!
//! This crate owns the request/response bodies used by both the backend
//! (root package) and `client`. Payloads are plain JSON over HTTP and text
//! websocket messages. Option tallies keep insertion order so a poll renders
//! in the order its creator typed the options.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Prefix under which every REST route is mounted.
pub const API_PREFIX: &str = "/api";

/// Websocket close code sent when a subscriber asks for an unknown poll.
pub const POLICY_VIOLATION_CLOSE_CODE: u16 = 1008;

/// Close reason paired with [`POLICY_VIOLATION_CLOSE_CODE`].
pub const POLL_NOT_FOUND_CLOSE_REASON: &str = "Poll not found or expired";

/// Keys inspected, in order, when pulling a poll id out of a create response.
pub const POLL_ID_KEYS: [&str; 4] = ["poll_id", "id", "pollId", "PollID"];

/// Error returned when a response body does not match the expected shape.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A create response decoded fine but carried none of [`POLL_ID_KEYS`].
    #[error("response did not include a poll id")]
    MissingPollId,
    /// The body was not valid JSON for the target type.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// PATHS
// =============================================================================

/// `POST` target for poll creation.
#[must_use]
pub fn polls_path() -> String {
    format!("{API_PREFIX}/polls")
}

/// Path segments of one poll snapshot. The id stays a single segment, so
/// URL builders must percent-encode it rather than splice it into a string.
#[must_use]
pub fn poll_segments(poll_id: &str) -> [&str; 3] {
    ["api", "polls", poll_id]
}

#[must_use]
pub fn vote_segments(poll_id: &str) -> [&str; 4] {
    ["api", "polls", poll_id, "vote"]
}

#[must_use]
pub fn close_segments(poll_id: &str) -> [&str; 4] {
    ["api", "polls", poll_id, "close"]
}

#[must_use]
pub fn anonymous_id_path() -> String {
    format!("{API_PREFIX}/anonymous-id")
}

/// Live-update channel for one poll. Not under [`API_PREFIX`].
#[must_use]
pub fn ws_segments(poll_id: &str) -> [&str; 3] {
    ["ws", "polls", poll_id]
}

// =============================================================================
// OPTION COUNTS
// =============================================================================

/// Ordered option label -> vote count map.
///
/// Serializes as a JSON object. Labels are unique; inserting an existing label
/// updates it in place and keeps its position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionCounts(Vec<(String, u64)>);

impl OptionCounts {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build zeroed tallies from labels. Later duplicates are dropped.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut counts = Self::new();
        for label in labels {
            let label = label.into();
            if !counts.contains(&label) {
                counts.0.push((label, 0));
            }
        }
        counts
    }

    /// Insert or overwrite a count.
    pub fn insert(&mut self, label: impl Into<String>, count: u64) {
        let label = label.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == label) {
            Some(entry) => entry.1 = count,
            None => self.0.push((label, count)),
        }
    }

    /// Add one vote to `label`. Returns the new count, or `None` if unknown.
    pub fn increment(&mut self, label: &str) -> Option<u64> {
        let entry = self.0.iter_mut().find(|(existing, _)| existing == label)?;
        entry.1 = entry.1.saturating_add(1);
        Some(entry.1)
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<u64> {
        self.0.iter().find(|(existing, _)| existing == label).map(|(_, count)| *count)
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|(existing, _)| existing == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(label, count)| (label.as_str(), *count))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all counts, saturating at `u64::MAX`.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.iter().fold(0u64, |sum, (_, count)| sum.saturating_add(*count))
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for OptionCounts {
    fn from_iter<T: IntoIterator<Item = (S, u64)>>(iter: T) -> Self {
        let mut counts = Self::new();
        for (label, count) in iter {
            counts.insert(label, count);
        }
        counts
    }
}

impl Serialize for OptionCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, count) in &self.0 {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OptionCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountsVisitor;

        impl<'de> Visitor<'de> for CountsVisitor {
            type Value = OptionCounts;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of option label to vote count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut counts = OptionCounts::new();
                while let Some((label, count)) = access.next_entry::<String, u64>()? {
                    counts.insert(label, count);
                }
                Ok(counts)
            }
        }

        deserializer.deserialize_map(CountsVisitor)
    }
}

// =============================================================================
// REQUEST / RESPONSE BODIES
// =============================================================================

/// Body of `POST /api/polls`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePollRequest {
    pub question: String,
    pub options: Vec<String>,
}

/// Canonical body returned by `POST /api/polls`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePollResponse {
    pub poll_id: String,
}

/// Full poll state returned by `GET /api/polls/{id}`.
///
/// Every field is defaulted: clients render whatever the server sends.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSnapshot {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: OptionCounts,
    #[serde(default)]
    pub is_open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voting_ends_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_visible_until: Option<String>,
    #[serde(default)]
    pub is_creator: bool,
}

/// Payload pushed over `/ws/polls/{id}`.
///
/// The first message after connect carries `voting_ends_at`; creator closes
/// carry `message`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollUpdate {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: OptionCounts,
    #[serde(default)]
    pub is_open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voting_ends_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body of `POST /api/polls/{id}/vote`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub option: String,
    pub anon_id: String,
}

/// Body of `POST /api/polls/{id}/close`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosePollRequest {
    pub anon_id: String,
}

/// Generic success body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body. `detail` is the human-readable reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Body of `GET /api/anonymous-id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymousIdResponse {
    pub anon_id: String,
}

// =============================================================================
// POLL ID EXTRACTION
// =============================================================================

/// Pull a poll id out of a create response, trying each of [`POLL_ID_KEYS`].
///
/// Empty strings, zero, and non-scalar values are skipped so a later key can
/// still match.
#[must_use]
pub fn extract_poll_id(body: &Value) -> Option<String> {
    let map = body.as_object()?;
    POLL_ID_KEYS.iter().find_map(|key| match map.get(*key)? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    })
}

/// Parse raw create-response bytes into a poll id.
///
/// # Errors
///
/// Returns [`ProtocolError::Json`] for malformed JSON and
/// [`ProtocolError::MissingPollId`] when no id key is present.
pub fn parse_create_response(bytes: &[u8]) -> Result<String, ProtocolError> {
    let body: Value = serde_json::from_slice(bytes)?;
    extract_poll_id(&body).ok_or(ProtocolError::MissingPollId)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
