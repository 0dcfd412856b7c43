//! The game module wires everything together: it parses the configuration, installs logging,
//! builds the identity adapter and the backend connector, and runs the event loop.
//!
//! The loop draws the frame for the current session state, waits for the player to pick an action,
//! and runs that action to completion before drawing again. Remote calls show a spinner while they
//! are in flight.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use console::{style, Term};
use indicatif::ProgressBar;
use tracing::info;
use ureq::Agent;

use crate::auth::{Authenticator, IdentityClient};
use crate::backend::Connect;
use crate::config::Cli;
use crate::input::{select_action, take_guess, Action};
use crate::logging;
use crate::session::Session;
use crate::view::render;

/// The terminal width assumed when the real one cannot be read.
const FALLBACK_COLS: usize = 80;

/// Initializes the game and runs the event loop until the player quits.
///
/// # Errors
///
/// The function may return any one of the following errors:
///
/// - `clap::Error`, when the configuration is incomplete.
/// - `io::Error`, when the terminal cannot be drawn on.
/// - `dialoguer::Error`, when reading the player's input fails.
/// - `anyhow::Error`, when the log file or filter is unusable.
pub fn init() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_file.as_deref(), cli.log_level.as_deref())?;

    let auth = IdentityClient::new(
        Agent::new_with_defaults(),
        &cli.identity_provider,
        cli.session_file.clone(),
    );
    let mut session = Session::new(auth, cli.actor_factory());
    let term = Term::stdout();

    info!(
        provider = %cli.identity_provider,
        host = %cli.host,
        network = %cli.network,
        "starting"
    );
    term.set_title("guessing-number");

    with_spinner("Restoring session...", || session.init());

    loop {
        draw(&term, &session)?;

        match select_action(&term, &Action::available(session.state()))? {
            Action::Login => login(&mut session),
            Action::Logout => session.logout(),
            Action::StartGame => with_spinner("Starting a new game...", || session.start_game()),
            Action::SubmitGuess => {
                let guess = take_guess(&term)?;
                session.set_guess(&guess);
                with_spinner("Checking your guess...", || session.submit_guess());
            }
            Action::Quit => {
                term.clear_screen()?;
                break Ok(());
            }
        }
    }
}

/// Clears the screen and draws the frame for the current state.
fn draw<A: Authenticator, C: Connect>(term: &Term, session: &Session<A, C>) -> Result<()> {
    let cols = match term.size_checked() {
        Some((_, cols)) => usize::from(cols),
        None => FALLBACK_COLS,
    };

    term.clear_screen()?;
    term.write_str(&render(session.state(), cols)?)?;
    term.write_line("")?;
    Ok(())
}

/// Runs the login handshake, printing the challenge above a spinner while the provider waits for
/// the player to approve it.
fn login<A: Authenticator, C: Connect>(session: &mut Session<A, C>) {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Waiting for the identity provider...");
    spinner.enable_steady_tick(Duration::from_millis(50));

    session.login(&|challenge| {
        spinner.println(format!(
            "Open {} and enter the code {}",
            style(&challenge.verification_uri).underlined(),
            style(&challenge.user_code).bold().on_cyan()
        ));
    });

    spinner.finish_and_clear();
}

/// Runs `action` with a spinner showing `message`.
fn with_spinner<F: FnOnce()>(message: &'static str, action: F) {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(50));

    action();

    spinner.finish_and_clear();
}
