//! Pure text rendering of poll screens.
//!
//! Nothing here performs I/O; views call [`render_poll`] and decide where the
//! text goes.

use std::fmt::Write;

use protocol::PollSnapshot;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

const BAR_WIDTH: u64 = 20;
const NO_QUESTION: &str = "No question";

/// One option row as shown to the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRow {
    pub label: String,
    pub votes: u64,
}

/// Everything a view needs to draw a loaded poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollScreen {
    pub poll_id: String,
    pub question: String,
    pub options: Vec<OptionRow>,
    pub is_open: bool,
    pub voting_ends_at: Option<OffsetDateTime>,
    /// Viewer created the poll and may close it.
    pub is_creator: bool,
}

impl PollScreen {
    #[must_use]
    pub fn from_snapshot(poll_id: &str, snapshot: &PollSnapshot) -> Self {
        let question = if snapshot.question.trim().is_empty() {
            NO_QUESTION.to_owned()
        } else {
            snapshot.question.clone()
        };
        Self {
            poll_id: poll_id.to_owned(),
            question,
            options: snapshot
                .options
                .iter()
                .map(|(label, votes)| OptionRow { label: label.to_owned(), votes })
                .collect(),
            is_open: snapshot.is_open,
            voting_ends_at: snapshot.voting_ends_at.as_deref().and_then(parse_timestamp),
            is_creator: snapshot.is_creator,
        }
    }

    /// Options accept votes only while the poll is open.
    #[must_use]
    pub fn can_vote(&self) -> bool {
        self.is_open
    }

    /// Sum of all rows, saturating at `u64::MAX`.
    #[must_use]
    pub fn total_votes(&self) -> u64 {
        self.options.iter().fold(0u64, |sum, row| sum.saturating_add(row.votes))
    }
}

/// Parse an RFC 3339 timestamp. Offset-less ISO timestamps are read as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    OffsetDateTime::parse(raw, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(&format!("{raw}Z"), &Rfc3339))
        .ok()
}

/// Status line: open with remaining time, or closed.
#[must_use]
pub fn status_line(is_open: bool, ends_at: Option<OffsetDateTime>, now: OffsetDateTime) -> String {
    if !is_open {
        return "Voting closed".to_owned();
    }
    let Some(ends_at) = ends_at else {
        return "Voting open".to_owned();
    };
    let remaining = ends_at - now;
    if remaining <= Duration::ZERO {
        return "Voting closed".to_owned();
    }
    format!("Voting open · ends in {}", format_remaining(remaining))
}

fn format_remaining(remaining: Duration) -> String {
    let hours = remaining.whole_hours();
    let minutes = remaining.whole_minutes() % 60;
    match (hours, minutes) {
        (0, 0) => "less than a minute".to_owned(),
        (0, m) => format!("{m}m"),
        (h, m) => format!("{h}h {m}m"),
    }
}

#[must_use]
pub fn votes_label(votes: u64) -> String {
    if votes == 1 { "1 vote".to_owned() } else { format!("{votes} votes") }
}

/// `votes / total` scaled to `0..=scale`, rounded to nearest. Counts come from
/// the server unchecked, so the arithmetic is widened and clamped.
fn scaled_share(votes: u64, total: u64, scale: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    let votes = u128::from(votes.min(total));
    let total = u128::from(total);
    let share = (votes * u128::from(scale) + total / 2) / total;
    u64::try_from(share).unwrap_or(scale).min(scale)
}

/// Rounded share of `total` as a whole percentage.
#[must_use]
pub fn percentage(votes: u64, total: u64) -> u64 {
    scaled_share(votes, total, 100)
}

fn bar(votes: u64, total: u64) -> String {
    let filled = usize::try_from(scaled_share(votes, total, BAR_WIDTH)).unwrap_or(0);
    let empty = usize::try_from(BAR_WIDTH).unwrap_or(0) - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

/// Multi-line rendering of a poll screen.
#[must_use]
pub fn render_poll(screen: &PollScreen, now: OffsetDateTime) -> String {
    let total = screen.total_votes();
    let label_width = screen.options.iter().map(|row| row.label.chars().count()).max().unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "Poll {}", screen.poll_id);
    let _ = writeln!(out, "{}", screen.question);
    let _ = writeln!(out, "{}", status_line(screen.is_open, screen.voting_ends_at, now));
    let _ = writeln!(out);
    for (index, row) in screen.options.iter().enumerate() {
        // Numbered rows are the votable ones; closed polls list with dashes.
        let marker = if screen.can_vote() { format!("{:>2}.", index + 1) } else { " -".to_owned() };
        let _ = writeln!(
            out,
            "  {marker} {:<label_width$}  {}  {} ({}%)",
            row.label,
            bar(row.votes, total),
            votes_label(row.votes),
            percentage(row.votes, total),
        );
    }
    let _ = writeln!(out);
    let _ = write!(out, "Total: {}", votes_label(total));
    if screen.is_creator && screen.is_open {
        let _ = write!(out, "  (you created this poll and can close it)");
    }
    out
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
