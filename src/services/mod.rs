//! Domain services used by the HTTP and websocket routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own poll rules and subscriber fan-out so route handlers
//! stay focused on protocol translation.

pub mod cleanup;
pub mod poll;
