//! Terminal client for the anonymous polling service.
//!
//! The crate is split the way a poll screen is: [`api`] talks REST to the
//! backend, [`live`] keeps a websocket subscription alive, [`render`] turns a
//! snapshot into text, and [`session`] ties them together behind a [`view::View`].
//! [`identity`] persists the anonymous id that every request carries.

pub mod api;
pub mod error;
pub mod identity;
pub mod live;
pub mod render;
pub mod session;
pub mod view;

#[cfg(test)]
mod test_support;
