//! The library components of the game. They allow logging in with an identity provider, starting
//! rounds and submitting guesses against a remote backend, and drawing the result in the terminal.
//!
//! The starting point of the library is the game.rs file, which contains the event loop. The
//! session.rs file holds the state the loop draws and the operations it triggers, written against
//! the [`auth::Authenticator`] and [`backend::GameBackend`] traits so they can be swapped out.

#![expect(
    clippy::cargo_common_metadata,
    reason = "The package has not yet been pushed to a remote."
)]

pub mod auth;
pub mod backend;
mod config;
pub mod error;
mod game;
mod input;
mod logging;
pub mod session;
#[cfg(test)]
mod stub;
mod view;

pub use game::init;
