//! # guessing-number
//!
//! This crate is a terminal client for a number guessing game. The secret number and the rules
//! live in a remote backend; this client only logs the player in with an identity provider, starts
//! rounds, sends guesses and shows what the backend answers.
//!
//! Logging in goes through the identity provider's device flow: the client prints a page and a
//! code, the player approves it in a browser, and the client picks the session up from there.

#![expect(
    unused_crate_dependencies,
    reason = "The dependencies are used in the library crate."
)]

use anyhow::Result;
use guessing_number::init;

fn main() -> Result<()> {
    init()
}
