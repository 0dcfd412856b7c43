//! This module draws the session state as a centered frame of text.
//!
//! A logged out player only ever sees the welcome text and the login prompt; the game controls,
//! the status message and the instructions are drawn once the session is authenticated.

use std::fmt::Write as _;

use anyhow::Result;
use console::{pad_str, style, Alignment, StyledObject};

use crate::session::{GameState, MessageKind};

/// The title shown at the top of every frame.
const TITLE: &str = "Number Guessing Game";

/// The rules shown under the game controls.
const INSTRUCTIONS: [&str; 4] = [
    "Choose \"Start New Game\" to begin",
    "Enter a number between 1 and 100",
    "The game will tell you if your guess is too high or too low",
    "Try to guess the correct number!",
];

/// Renders the frame for `state` on a terminal `cols` columns wide.
///
/// # Errors
///
/// Returns an error if writing into the frame buffer fails.
pub(crate) fn render(state: &GameState, cols: usize) -> Result<String> {
    let mut frame = String::new();

    centered(&mut frame, cols, &style(TITLE).bold().underlined())?;
    let auth_button = if state.is_authenticated() {
        "[ Logout ]"
    } else {
        "[ Login ]"
    };
    writeln!(frame, "{}", pad_str(auth_button, cols, Alignment::Right, None))?;
    writeln!(frame)?;

    if state.is_authenticated() {
        render_game(&mut frame, state, cols)?;
    } else {
        centered(
            &mut frame,
            cols,
            &style("Welcome to Number Guessing Game!").bold(),
        )?;
        centered(
            &mut frame,
            cols,
            &style("Please login with your identity provider to play."),
        )?;
        render_message(&mut frame, state, cols)?;
    }

    Ok(frame)
}

/// Draws the game controls, the status message and the instructions.
fn render_game(frame: &mut String, state: &GameState, cols: usize) -> Result<()> {
    if state.is_game_active() {
        centered(frame, cols, &style("   Game in Progress   ").dim())?;
        centered(
            frame,
            cols,
            &style(format!("Your guess: [{:<20}]", state.guess())).bold(),
        )?;
        centered(frame, cols, &style("Enter number (1-100)").dim().italic())?;
    } else {
        centered(frame, cols, &style("   Start New Game   ").bold().on_cyan())?;
    }

    render_message(frame, state, cols)?;

    writeln!(frame)?;
    centered(frame, cols, &style("How to Play:").bold())?;
    for line in INSTRUCTIONS {
        centered(frame, cols, &style(format!("- {line}")))?;
    }

    Ok(())
}

/// Draws the status message, coloured by its kind, if there is one.
fn render_message(frame: &mut String, state: &GameState, cols: usize) -> Result<()> {
    let Some(kind) = state.message_kind() else {
        return Ok(());
    };

    let message = style(state.message()).bold();
    let message = match kind {
        MessageKind::Success => message.green(),
        MessageKind::Error => message.red(),
        MessageKind::Info => message.cyan(),
    };

    writeln!(frame)?;
    centered(frame, cols, &message)
}

/// Writes one centered line into the frame.
fn centered<D: std::fmt::Display>(
    frame: &mut String,
    cols: usize,
    text: &StyledObject<D>,
) -> Result<()> {
    let text = text.to_string();
    writeln!(frame, "{}", pad_str(&text, cols, Alignment::Center, None))?;
    Ok(())
}
