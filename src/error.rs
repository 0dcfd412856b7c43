//! This module holds the errors raised by the two remote collaborators of the game: the identity
//! provider and the game backend.
//!
//! Both are mapped from `ureq` errors so that HTTP status codes turn into named variants, the same
//! way a status code table would be read off the provider's documentation.

use std::io;

use thiserror::Error;

/// This enum holds the ways in which a login handshake or the stored identity session can fail.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The user or the provider turned the login request down.
    #[error("the identity provider denied the login: {0}")]
    Denied(String),
    /// The device code ran out of time before anyone approved it.
    #[error("the login request expired before it was approved")]
    Expired,
    /// The provider sent back a payload that does not follow the handshake schema.
    #[error("malformed identity data: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The provider answered with a status code outside the 2xx range.
    #[error("the identity provider answered with status {0}")]
    Status(u16),
    /// The stored session could not be read or written.
    #[error("could not access the stored session: {0}")]
    Storage(#[from] io::Error),
    /// The request never got a response.
    #[error("could not reach the identity provider: {0}")]
    Transport(String),
}

impl From<ureq::Error> for AuthError {
    fn from(value: ureq::Error) -> Self {
        match value {
            ureq::Error::StatusCode(code) => Self::Status(code),
            ureq::Error::Json(err) => Self::Malformed(err),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// This enum holds the ways in which a call to the game backend can fail. The game does not tell
/// transient failures from permanent ones; every variant ends the attempted action and nothing
/// else.
#[expect(
    clippy::arbitrary_source_item_ordering,
    reason = "The status variants follow the order of their codes."
)]
#[derive(Error, Debug)]
pub enum BackendError {
    /// There is no backend handle because the session is not authenticated.
    #[error("not connected to the backend")]
    NotConnected,
    /// The backend ran the call and rejected it.
    #[error("the call was rejected ({code}): {message}")]
    Rejected {
        /// The reject code reported by the backend.
        code: u32,
        /// The human-readable reason reported by the backend.
        message: String,
    },
    /// 400
    #[error("bad request")]
    BadRequest,
    /// 401 and 403
    #[error("the identity was not accepted by the backend")]
    Unauthorized,
    /// 404
    #[error("the backend canister could not be found")]
    NotFound,
    /// 408, or the configured timeout ran out.
    #[error("timed out")]
    TimedOut,
    /// 429
    #[error("rate limited")]
    RateLimited,
    /// 502 and 503
    #[error("the backend is unavailable")]
    Unavailable,
    /// Any other status code outside the 2xx range.
    #[error("the backend answered with status {0}")]
    Status(u16),
    /// The response body does not follow the gateway schema.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// The request never got a response.
    #[error("could not reach the backend: {0}")]
    Transport(String),
}

impl From<ureq::Error> for BackendError {
    fn from(value: ureq::Error) -> Self {
        match value {
            ureq::Error::StatusCode(code) => match code {
                400 => Self::BadRequest,
                401 | 403 => Self::Unauthorized,
                404 => Self::NotFound,
                408 => Self::TimedOut,
                429 => Self::RateLimited,
                502 | 503 => Self::Unavailable,
                _ => Self::Status(code),
            },
            ureq::Error::Timeout(_) => Self::TimedOut,
            ureq::Error::Json(err) => Self::Malformed(err.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}
