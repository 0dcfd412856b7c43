//! This module contains the session of one player: the state the terminal view renders, and the
//! operations the user triggers against the identity provider and the game backend.
//!
//! Every operation runs to completion before the next one can be chosen, so the state is only ever
//! written from here and never seen half-updated. Failures only touch the message; a failed guess
//! keeps the game going and a failed login leaves the session logged out.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::auth::{Authenticator, Challenge, Identity};
use crate::backend::{Connect, GameBackend};
use crate::error::BackendError;

/// The text the backend puts in its reply to a winning guess.
///
/// Detecting a win by looking for a substring in free text is fragile; it follows what the
/// backend does today and should not be extended to other outcomes.
pub const WIN_MARKER: &str = "Congratulations";

/// The message shown when the guess field does not hold a number.
pub const INVALID_GUESS: &str = "Please enter a valid number";

/// Accepts a run of ASCII digits with optional surrounding whitespace.
#[expect(
    clippy::unwrap_used,
    reason = "The pattern is a literal, and the parsing tests prove it compiles."
)]
static NUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\A\s*(\d+)\s*\z").unwrap());

/// This enum holds the kinds of status messages, which only affect how a message is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// The message reports a problem.
    Error,
    /// Any other message.
    Info,
    /// The message reports a win.
    Success,
}

impl MessageKind {
    /// Classifies a message by the markers it contains. A win takes precedence over an error.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        if message.contains(WIN_MARKER) {
            Self::Success
        } else if message.contains("Error") {
            Self::Error
        } else {
            Self::Info
        }
    }
}

/// The state the view renders. Nothing in here outlives the process.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GameState {
    /// The current text of the guess input.
    guess: String,
    /// Whether an identity session is established and the backend handle is open.
    is_authenticated: bool,
    /// Whether a round is in progress.
    is_game_active: bool,
    /// The last status message, empty when there is nothing to say.
    message: String,
}

impl GameState {
    /// Returns the current text of the guess input.
    #[must_use]
    pub fn guess(&self) -> &str {
        &self.guess
    }

    /// Returns whether the player is logged in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Returns whether a round is in progress.
    #[must_use]
    pub const fn is_game_active(&self) -> bool {
        self.is_game_active
    }

    /// Returns the last status message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns how the last status message should be rendered, if there is one.
    #[must_use]
    pub fn message_kind(&self) -> Option<MessageKind> {
        (!self.message.is_empty()).then(|| MessageKind::classify(&self.message))
    }
}

/// A player's session, driving an [`Authenticator`] and the backend handles opened by a
/// [`Connect`] implementation.
pub struct Session<A, C: Connect> {
    /// The backend handle, open exactly while the session is authenticated.
    actor: Option<C::Backend>,
    /// The identity adapter.
    auth: A,
    /// Opens backend handles for an identity.
    connector: C,
    /// The state the view renders.
    state: GameState,
}

impl<A: Authenticator, C: Connect> Session<A, C> {
    /// Creates a logged out session with no message.
    pub fn new(auth: A, connector: C) -> Self {
        Self {
            actor: None,
            auth,
            connector,
            state: GameState::default(),
        }
    }

    /// Returns the state to render.
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Returns whether a backend handle is open.
    pub const fn is_connected(&self) -> bool {
        self.actor.is_some()
    }

    /// Returns the identity adapter.
    pub const fn authenticator(&self) -> &A {
        &self.auth
    }

    /// Picks up an identity session left over from an earlier run, if it is still valid.
    pub fn init(&mut self) {
        match self.auth.current_identity().cloned() {
            Some(identity) => {
                debug!(principal = %identity.principal, "resuming identity session");
                self.handle_authenticated(&identity);
            }
            None => debug!("no identity session to resume"),
        }
    }

    /// Runs the login handshake and opens the backend handle. `notify` is handed the challenge the
    /// player must complete.
    ///
    /// If the identity session is still valid and only the backend handle is missing, because
    /// opening it failed earlier, the handle is opened again without a new handshake.
    pub fn login(&mut self, notify: &dyn Fn(&Challenge)) {
        if let Some(identity) = self.auth.current_identity().cloned() {
            debug!(principal = %identity.principal, "reconnecting with the current identity");
            self.handle_authenticated(&identity);
            return;
        }

        match self.auth.login(notify) {
            Ok(identity) => self.handle_authenticated(&identity),
            Err(err) => {
                warn!(error = %err, "login failed");
                self.state.message = format!("Error logging in: {err}");
            }
        }
    }

    /// Drops the identity session and puts every piece of state back to where it started.
    pub fn logout(&mut self) {
        if let Err(err) = self.auth.logout() {
            warn!(error = %err, "could not clear the identity session");
        }

        self.actor = None;
        self.state = GameState::default();
    }

    /// Sets the text of the guess input.
    pub fn set_guess(&mut self, value: &str) {
        value.clone_into(&mut self.state.guess);
    }

    /// Starts a new round.
    pub fn start_game(&mut self) {
        let result = match self.actor.as_mut() {
            Some(actor) => actor.start_game(),
            None => Err(BackendError::NotConnected),
        };

        match result {
            Ok(reply) => {
                info!(%reply, "game started");
                self.state.message = reply;
                self.state.is_game_active = true;
                self.state.guess.clear();
            }
            Err(err) => {
                warn!(error = %err, "could not start a game");
                self.state.message = format!("Error starting game: {err}");
            }
        }
    }

    /// Submits the current text of the guess input. Text that is not a number never reaches the
    /// backend.
    pub fn submit_guess(&mut self) {
        let Some(number) = parse_guess(&self.state.guess) else {
            debug!(guess = %self.state.guess, "rejected a non-numeric guess");
            INVALID_GUESS.clone_into(&mut self.state.message);
            return;
        };

        let result = match self.actor.as_mut() {
            Some(actor) => actor.guess(number),
            None => Err(BackendError::NotConnected),
        };

        match result {
            Ok(reply) => {
                info!(number, %reply, "guess answered");
                if reply.contains(WIN_MARKER) {
                    self.state.is_game_active = false;
                }
                self.state.message = reply;
            }
            Err(err) => {
                warn!(number, error = %err, "could not submit a guess");
                self.state.message = format!("Error submitting guess: {err}");
            }
        }

        self.state.guess.clear();
    }

    /// Opens the backend handle for `identity` and marks the session as authenticated.
    fn handle_authenticated(&mut self, identity: &Identity) {
        match self.connector.connect(identity) {
            Ok(actor) => {
                self.actor = Some(actor);
                self.state.is_authenticated = true;
                self.state.message.clear();
            }
            Err(err) => {
                warn!(error = %err, "could not connect to the backend");
                self.state.message = format!("Error connecting to backend: {err}");
            }
        }
    }
}

/// Parses the text of the guess input, returning `None` if it is empty, not a number, or too
/// large for the backend.
#[must_use]
pub fn parse_guess(input: &str) -> Option<u32> {
    let digits = NUMERIC.captures(input)?.get(1)?;
    digits.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;
    use crate::error::AuthError;

    #[derive(Default)]
    struct MockAuth {
        failed_logins: usize,
        handshakes: usize,
        identity: Option<Identity>,
        logouts: Rc<Cell<usize>>,
    }

    fn identity() -> Identity {
        Identity {
            principal: "2vxsx-fae".to_owned(),
            token: "token".to_owned(),
            expires_at: u64::MAX,
        }
    }

    impl Authenticator for MockAuth {
        fn current_identity(&self) -> Option<&Identity> {
            self.identity.as_ref()
        }

        fn login(&mut self, notify: &dyn Fn(&Challenge)) -> Result<Identity, AuthError> {
            notify(&Challenge {
                user_code: "ABCD-1234".to_owned(),
                verification_uri: "http://provider.test/device".to_owned(),
            });
            self.handshakes += 1;
            if self.failed_logins > 0 {
                self.failed_logins -= 1;
                return Err(AuthError::Denied("cancelled".to_owned()));
            }
            Ok(self.identity.insert(identity()).clone())
        }

        fn logout(&mut self) -> Result<(), AuthError> {
            self.logouts.set(self.logouts.get() + 1);
            self.identity = None;
            Ok(())
        }
    }

    #[derive(Default, Clone)]
    struct Calls {
        guesses: Rc<RefCell<Vec<u32>>>,
        replies: Rc<RefCell<VecDeque<Result<String, BackendError>>>>,
        starts: Rc<Cell<usize>>,
    }

    impl Calls {
        fn reply(&self, reply: &str) {
            self.replies.borrow_mut().push_back(Ok(reply.to_owned()));
        }

        fn fail(&self, err: BackendError) {
            self.replies.borrow_mut().push_back(Err(err));
        }

        fn next(&self) -> Result<String, BackendError> {
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(BackendError::Unavailable))
        }
    }

    struct MockBackend(Calls);

    impl GameBackend for MockBackend {
        fn start_game(&mut self) -> Result<String, BackendError> {
            self.0.starts.set(self.0.starts.get() + 1);
            self.0.next()
        }

        fn guess(&mut self, number: u32) -> Result<String, BackendError> {
            self.0.guesses.borrow_mut().push(number);
            self.0.next()
        }
    }

    struct MockConnector {
        calls: Calls,
        failures: Cell<usize>,
    }

    impl Connect for MockConnector {
        type Backend = MockBackend;

        fn connect(&self, _identity: &Identity) -> Result<MockBackend, BackendError> {
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(BackendError::Transport("connection refused".to_owned()));
            }
            Ok(MockBackend(self.calls.clone()))
        }
    }

    fn session(auth: MockAuth) -> (Session<MockAuth, MockConnector>, Calls) {
        let calls = Calls::default();
        let connector = MockConnector {
            calls: calls.clone(),
            failures: Cell::new(0),
        };
        (Session::new(auth, connector), calls)
    }

    fn playing() -> (Session<MockAuth, MockConnector>, Calls) {
        let (mut session, calls) = session(MockAuth::default());
        session.login(&|_| {});
        calls.reply("Game started, guess a number between 1 and 100!");
        session.start_game();
        (session, calls)
    }

    #[test]
    fn parse_guess_accepts_only_numbers() {
        assert_eq!(parse_guess("50"), Some(50));
        assert_eq!(parse_guess(" 73 "), Some(73));
        for input in ["", "   ", "abc", "5a", "-3", "1.5", "99999999999"] {
            assert_eq!(parse_guess(input), None, "{input:?} is not a valid guess");
        }
    }

    #[test]
    fn message_kind_follows_markers() {
        assert_eq!(
            MessageKind::classify("Congratulations! You guessed it!"),
            MessageKind::Success
        );
        assert_eq!(
            MessageKind::classify("Error starting game: timed out"),
            MessageKind::Error
        );
        assert_eq!(MessageKind::classify("Too high!"), MessageKind::Info);
        assert_eq!(GameState::default().message_kind(), None);
    }

    #[test]
    fn init_resumes_a_valid_identity() {
        let (mut session, _) = session(MockAuth {
            identity: Some(identity()),
            ..MockAuth::default()
        });
        session.init();
        assert!(session.state().is_authenticated());
        assert!(session.is_connected());
    }

    #[test]
    fn init_without_identity_stays_logged_out() {
        let (mut session, _) = session(MockAuth::default());
        session.init();
        assert!(!session.state().is_authenticated());
        assert!(!session.is_connected());
    }

    #[test]
    fn login_opens_the_backend_and_shows_the_challenge() {
        let (mut session, _) = session(MockAuth::default());
        let shown = RefCell::new(None);
        session.login(&|challenge| {
            let _ = shown.replace(Some(challenge.user_code.clone()));
        });
        assert_eq!(shown.into_inner().as_deref(), Some("ABCD-1234"));
        assert!(session.state().is_authenticated());
        assert!(session.is_connected());
    }

    #[test]
    fn failed_login_is_visible() {
        let (mut session, _) = session(MockAuth {
            failed_logins: 1,
            ..MockAuth::default()
        });
        session.login(&|_| {});
        assert!(!session.state().is_authenticated());
        assert_eq!(
            session.state().message(),
            "Error logging in: the identity provider denied the login: cancelled"
        );
    }

    #[test]
    fn successful_login_clears_an_earlier_error() {
        let (mut session, _) = session(MockAuth {
            failed_logins: 1,
            ..MockAuth::default()
        });
        session.login(&|_| {});
        assert!(session.state().message().starts_with("Error logging in:"));

        session.login(&|_| {});
        assert!(session.state().is_authenticated());
        assert_eq!(session.state().message(), "");
        assert_eq!(session.state().message_kind(), None);
    }

    #[test]
    fn failed_connection_keeps_the_session_logged_out() {
        let mut session = Session::new(
            MockAuth::default(),
            MockConnector {
                calls: Calls::default(),
                failures: Cell::new(1),
            },
        );
        session.login(&|_| {});
        assert!(!session.state().is_authenticated());
        assert!(!session.is_connected());
        assert!(session
            .state()
            .message()
            .starts_with("Error connecting to backend:"));
    }

    #[test]
    fn login_after_a_failed_connection_reuses_the_identity() {
        let mut session = Session::new(
            MockAuth::default(),
            MockConnector {
                calls: Calls::default(),
                failures: Cell::new(1),
            },
        );
        session.login(&|_| {});
        assert!(!session.is_connected());

        session.login(&|_| panic!("no second handshake is expected"));

        assert!(session.state().is_authenticated());
        assert!(session.is_connected());
        assert_eq!(session.authenticator().handshakes, 1);
        assert_eq!(session.state().message(), "");
    }

    #[test]
    fn start_game_activates_and_clears_the_guess() {
        let (mut session, calls) = session(MockAuth::default());
        session.login(&|_| {});
        session.set_guess("12");
        calls.reply("Game started, guess a number between 1 and 100!");
        session.start_game();

        assert!(session.state().is_game_active());
        assert_eq!(session.state().guess(), "");
        assert_eq!(
            session.state().message(),
            "Game started, guess a number between 1 and 100!"
        );
    }

    #[test]
    fn failed_start_keeps_the_game_inactive() {
        let (mut session, calls) = session(MockAuth::default());
        session.login(&|_| {});
        calls.fail(BackendError::TimedOut);
        session.start_game();

        assert!(!session.state().is_game_active());
        assert_eq!(session.state().message(), "Error starting game: timed out");
    }

    #[test]
    fn start_game_without_backend_reports_it() {
        let (mut session, calls) = session(MockAuth::default());
        session.start_game();
        assert_eq!(calls.starts.get(), 0);
        assert_eq!(
            session.state().message(),
            "Error starting game: not connected to the backend"
        );
    }

    #[test]
    fn invalid_guesses_never_reach_the_backend() {
        let (mut session, calls) = playing();
        for input in ["", "abc", "12abc", "-1"] {
            session.set_guess(input);
            session.submit_guess();
            assert_eq!(session.state().message(), INVALID_GUESS);
            assert!(session.state().is_game_active());
        }
        assert!(calls.guesses.borrow().is_empty());
    }

    #[test]
    fn wrong_guess_keeps_the_game_active() {
        let (mut session, calls) = playing();
        session.set_guess("50");
        calls.reply("Too low, try again!");
        session.submit_guess();

        assert_eq!(*calls.guesses.borrow(), vec![50]);
        assert!(session.state().is_game_active());
        assert_eq!(session.state().message(), "Too low, try again!");
        assert_eq!(session.state().guess(), "");
    }

    #[test]
    fn winning_guess_ends_the_game() {
        let (mut session, calls) = playing();
        session.set_guess("73");
        calls.reply("Congratulations! You guessed it!");
        session.submit_guess();

        assert!(!session.state().is_game_active());
        assert_eq!(
            session.state().message_kind(),
            Some(MessageKind::Success)
        );
    }

    #[test]
    fn failed_guess_keeps_the_game_and_clears_the_input() {
        let (mut session, calls) = playing();
        session.set_guess("10");
        calls.fail(BackendError::Rejected {
            code: 5,
            message: "no game in progress".to_owned(),
        });
        session.submit_guess();

        assert!(session.state().is_game_active());
        assert_eq!(session.state().guess(), "");
        assert_eq!(
            session.state().message(),
            "Error submitting guess: the call was rejected (5): no game in progress"
        );
    }

    #[test]
    fn logout_resets_everything() {
        let (mut session, calls) = playing();
        session.set_guess("4");
        session.logout();

        assert_eq!(*session.state(), GameState::default());
        assert!(!session.is_connected());
        assert!(!session.authenticator().is_authenticated());
        assert_eq!(session.authenticator().logouts.get(), 1);

        session.start_game();
        assert_eq!(calls.starts.get(), 1, "no call goes out after logout");
    }

    #[test]
    fn logout_when_logged_out_is_harmless() {
        let (mut session, _) = session(MockAuth::default());
        session.logout();
        assert_eq!(*session.state(), GameState::default());
    }
}
