//! This module contains all functions related to taking input from the player. They use the
//! `dialoguer` crate to draw the menu of actions and the guess prompt.
//!
//! The guess prompt does no validation of its own; whatever the player types is handed to the
//! session, which decides whether it is a number and says so in its message.

use anyhow::Result;
use console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};

use crate::session::GameState;

/// This enum holds the actions a player can take from the menu under the frame.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum Action {
    /// Runs the identity provider handshake.
    Login,
    /// Drops the identity session.
    Logout,
    /// Leaves the game.
    Quit,
    /// Begins a new round.
    StartGame,
    /// Prompts for a guess and submits it.
    SubmitGuess,
}

impl Action {
    /// Returns the actions on offer for `state`, in the order they are listed. Game controls are
    /// only on offer once the player is logged in, and a new round cannot be started while one is
    /// in progress.
    pub(crate) fn available(state: &GameState) -> Vec<Self> {
        match (state.is_authenticated(), state.is_game_active()) {
            (false, _) => vec![Self::Login, Self::Quit],
            (true, false) => vec![Self::StartGame, Self::Logout, Self::Quit],
            (true, true) => vec![Self::SubmitGuess, Self::Logout, Self::Quit],
        }
    }

    /// Returns the label of the action in the menu.
    pub(crate) const fn repr(self) -> &'static str {
        match self {
            Self::Login => "Login to Play",
            Self::Logout => "Logout",
            Self::Quit => "Quit",
            Self::StartGame => "Start New Game",
            Self::SubmitGuess => "Submit Guess",
        }
    }
}

/// Draws the menu of `actions` and returns the one the player picked. Pressing escape quits.
pub(crate) fn select_action(term: &Term, actions: &[Action]) -> Result<Action> {
    let labels: Vec<&str> = actions.iter().map(|action| action.repr()).collect();
    let picked = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("{}", style("What now?").bold()))
        .items(&labels)
        .default(0)
        .interact_on_opt(term)?;

    Ok(picked
        .and_then(|index| actions.get(index).copied())
        .unwrap_or(Action::Quit))
}

/// Prompts for the text of a guess. Empty input is accepted so the session can report it.
pub(crate) fn take_guess(term: &Term) -> Result<String> {
    let input: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("{}", style("Enter number (1-100)").bold()))
        .allow_empty(true)
        .interact_text_on(term)?;

    Ok(input)
}
