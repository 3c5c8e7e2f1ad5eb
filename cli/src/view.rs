//! Presentation surface driven by [`crate::session::PollSession`].
//!
//! The session never prints. It tells a [`View`] what changed and the view
//! decides how to show it. [`TerminalView`] draws to stdout and reports
//! alerts on stderr.

use time::OffsetDateTime;

use crate::live::LiveStatus;
use crate::render::{PollScreen, render_poll};

pub trait View {
    /// Blocking, user-facing error or notice.
    fn alert(&mut self, message: &str);

    /// Return to the poll-creation screen.
    fn show_create(&mut self);

    /// Draw a freshly loaded poll.
    fn show_poll(&mut self, screen: &PollScreen);

    /// Redraw after counts or the open flag changed.
    fn update_poll(&mut self, screen: &PollScreen) {
        self.show_poll(screen);
    }

    /// A request is in flight; inputs should be disabled.
    fn set_busy(&mut self, busy: bool);

    fn show_share_link(&mut self, url: &str);

    fn set_live_status(&mut self, status: LiveStatus);
}

/// Terminal rendering.
#[derive(Debug, Default)]
pub struct TerminalView {
    /// Print the share link under each freshly loaded poll.
    pub show_links: bool,
}

impl TerminalView {
    #[must_use]
    pub fn new(show_links: bool) -> Self {
        Self { show_links }
    }
}

impl View for TerminalView {
    fn alert(&mut self, message: &str) {
        eprintln!("! {message}");
    }

    // Nothing to switch back to: each command starts from a blank terminal.
    fn show_create(&mut self) {}

    fn show_poll(&mut self, screen: &PollScreen) {
        println!("{}", render_poll(screen, OffsetDateTime::now_utc()));
    }

    fn update_poll(&mut self, screen: &PollScreen) {
        println!();
        self.show_poll(screen);
    }

    fn set_busy(&mut self, busy: bool) {
        if busy {
            eprintln!("Working...");
        }
    }

    fn show_share_link(&mut self, url: &str) {
        if self.show_links {
            println!("Share: {url}");
        }
    }

    fn set_live_status(&mut self, status: LiveStatus) {
        let label = match status {
            LiveStatus::Connecting => "connecting",
            LiveStatus::Connected => "connected",
            LiveStatus::Disconnected => "disconnected, retrying",
            LiveStatus::Ended => "ended",
        };
        eprintln!("[live] {label}");
    }
}
