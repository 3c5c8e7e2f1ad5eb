//! Anonymous real-time polling backend.
//!
//! Polls live in memory: creators open them with a question and options,
//! anonymous voters cast one vote each, and every websocket subscriber of a
//! poll receives the new tallies as they change. A background task evicts
//! polls once their retention window has passed.

pub mod config;
pub mod routes;
pub mod services;
pub mod state;
