//! This module contains the authentication adapter of the game.
//!
//! The [`Authenticator`] trait is the narrow capability the session needs from an identity
//! provider, and [`IdentityClient`] implements it over HTTP with a device authorization handshake:
//! the provider hands out a short code, the user approves it in a browser, and the client polls
//! until the provider answers with a session credential.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ureq::Agent;

use crate::error::AuthError;

/// The name this client announces itself with when it asks the provider for a device code.
const CLIENT_NAME: &str = "guessing-number";

/// The shortest interval the client will wait between two polls, whatever the provider says.
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The longest a device code is waited on, whatever the provider says.
const MAX_LOGIN_WINDOW: Duration = Duration::from_secs(60 * 60);

/// The capability to establish, query and drop an identity session.
pub trait Authenticator {
    /// Returns the identity of the current session, if there is one and it has not expired.
    fn current_identity(&self) -> Option<&Identity>;

    /// Returns whether a valid identity session exists.
    fn is_authenticated(&self) -> bool {
        self.current_identity().is_some()
    }

    /// Runs the login handshake. `notify` is called once with the challenge the user has to
    /// complete in a browser.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] when the provider cannot be reached, denies the login, or the
    /// challenge expires.
    fn login(&mut self, notify: &dyn Fn(&Challenge)) -> Result<Identity, AuthError>;

    /// Drops the identity session.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] when the stored session cannot be removed.
    fn logout(&mut self) -> Result<(), AuthError>;
}

/// The credential handed out by the identity provider after a successful handshake.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The principal the provider vouches for.
    pub principal: String,
    /// The bearer token presented to the backend.
    pub token: String,
    /// Unix time, in seconds, after which the credential is no longer valid.
    pub expires_at: u64,
}

impl Identity {
    /// Returns whether the credential is still valid at unix time `now`.
    #[must_use]
    pub const fn is_valid_at(&self, now: u64) -> bool {
        now < self.expires_at
    }

    /// Returns whether the credential is still valid right now.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(unix_now())
    }
}

/// What the user has to do to approve a login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// The code to enter on the verification page.
    pub user_code: String,
    /// The page where the code is entered.
    pub verification_uri: String,
}

/// The provider's answer to a device authorization request.
#[derive(Deserialize)]
struct DeviceAuthorization {
    /// The opaque code this client polls with.
    device_code: String,
    /// Seconds until the device code expires.
    expires_in: u64,
    /// Seconds to wait between polls.
    #[serde(default = "default_interval")]
    interval: u64,
    /// The code the user has to enter.
    user_code: String,
    /// The page where the user enters the code.
    verification_uri: String,
}

/// This enum holds the provider's answer to one poll of the token endpoint.
#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum TokenReply {
    /// The user approved the login.
    Approved {
        /// Seconds until the credential expires.
        expires_in: u64,
        /// The principal the provider vouches for.
        principal: String,
        /// The bearer token.
        token: String,
    },
    /// The user or the provider rejected the login.
    Denied {
        /// Why the login was rejected.
        #[serde(default)]
        reason: String,
    },
    /// Nobody has acted on the code yet.
    Pending,
}

/// The body of a device authorization request.
#[derive(Serialize)]
struct AuthorizeRequest<'name> {
    /// The name this client announces itself with.
    client_name: &'name str,
}

/// The body of a token poll.
#[derive(Serialize)]
struct TokenRequest<'code> {
    /// The device code being polled.
    device_code: &'code str,
}

/// An [`Authenticator`] talking to a remote identity provider.
///
/// When a session file is configured, the identity is written there after a successful login and
/// read back on the next start, so a still-valid session does not need a fresh login.
pub struct IdentityClient {
    /// The HTTP agent used for every request to the provider.
    agent: Agent,
    /// The identity of the current session.
    identity: Option<Identity>,
    /// The shortest wait between two polls of the token endpoint.
    poll_floor: Duration,
    /// The base URL of the identity provider.
    provider: String,
    /// Where the session is kept between runs, if anywhere.
    session_file: Option<PathBuf>,
}

impl IdentityClient {
    /// Creates a client for the provider at `provider`, restoring the identity stored in
    /// `session_file` if it exists and is still valid. A stored session that cannot be read or
    /// parsed is discarded, and the player simply starts logged out.
    #[must_use]
    pub fn new(agent: Agent, provider: &str, session_file: Option<PathBuf>) -> Self {
        let identity = session_file.as_deref().and_then(restore);

        Self {
            agent,
            identity,
            poll_floor: MIN_POLL_INTERVAL,
            provider: provider.trim_end_matches('/').to_owned(),
            session_file,
        }
    }

    /// Asks the provider for a new device code.
    fn authorize(&self) -> Result<DeviceAuthorization, AuthError> {
        let authorization = self
            .agent
            .post(format!("{}/device/authorize", self.provider))
            .send_json(&AuthorizeRequest {
                client_name: CLIENT_NAME,
            })?
            .into_body()
            .read_json()?;

        Ok(authorization)
    }

    /// Polls the token endpoint once.
    fn poll(&self, device_code: &str) -> Result<TokenReply, AuthError> {
        let reply = self
            .agent
            .post(format!("{}/device/token", self.provider))
            .send_json(&TokenRequest { device_code })?
            .into_body()
            .read_json()?;

        Ok(reply)
    }

    /// Writes the identity to the session file, if one is configured.
    fn store(&self, identity: &Identity) -> Result<(), AuthError> {
        if let Some(ref path) = self.session_file {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, serde_json::to_string(identity)?)?;
        }

        Ok(())
    }
}

impl Authenticator for IdentityClient {
    fn current_identity(&self) -> Option<&Identity> {
        self.identity.as_ref().filter(|identity| identity.is_valid())
    }

    fn login(&mut self, notify: &dyn Fn(&Challenge)) -> Result<Identity, AuthError> {
        let authorization = self.authorize()?;
        let window = Duration::from_secs(authorization.expires_in).min(MAX_LOGIN_WINDOW);
        let deadline = Instant::now()
            .checked_add(window)
            .ok_or(AuthError::Expired)?;
        let interval = Duration::from_secs(authorization.interval).max(self.poll_floor);

        notify(&Challenge {
            user_code: authorization.user_code,
            verification_uri: authorization.verification_uri,
        });

        loop {
            if Instant::now() >= deadline {
                warn!("device code expired before approval");
                break Err(AuthError::Expired);
            }

            thread::sleep(interval);

            match self.poll(&authorization.device_code)? {
                TokenReply::Pending => {}
                TokenReply::Denied { reason } => {
                    warn!(%reason, "login denied");
                    break Err(AuthError::Denied(reason));
                }
                TokenReply::Approved {
                    expires_in,
                    principal,
                    token,
                } => {
                    let identity = Identity {
                        principal,
                        token,
                        expires_at: unix_now().saturating_add(expires_in),
                    };
                    self.store(&identity)?;
                    info!(principal = %identity.principal, "logged in");
                    self.identity = Some(identity.clone());
                    break Ok(identity);
                }
            }
        }
    }

    fn logout(&mut self) -> Result<(), AuthError> {
        self.identity = None;

        if let Some(ref path) = self.session_file {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }

        info!("logged out");
        Ok(())
    }
}

/// Reads the identity stored at `path`. A missing file means no session; an unreadable, corrupt
/// or expired one is removed so it does not get in the way of the next start.
fn restore(path: &Path) -> Option<Identity> {
    if !path.exists() {
        return None;
    }

    let stored = fs::read_to_string(path)
        .map_err(AuthError::from)
        .and_then(|contents| serde_json::from_str::<Identity>(&contents).map_err(AuthError::from));

    match stored {
        Ok(identity) if identity.is_valid() => {
            debug!(principal = %identity.principal, "restored identity session");
            return Some(identity);
        }
        Ok(_) => debug!("stored identity session has expired"),
        Err(err) => warn!(path = %path.display(), error = %err, "discarding unreadable session"),
    }

    if let Err(err) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %err, "could not remove the stored session");
    }
    None
}

/// The poll interval used when the provider does not name one.
const fn default_interval() -> u64 {
    5
}

/// Returns the current unix time in seconds. A clock set before the epoch reads as the epoch.
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}
