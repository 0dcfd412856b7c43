//! This module contains the remote procedure proxy to the game backend.
//!
//! The backend is reached through this project's own HTTP gateway, which sits in front of the game
//! canister: it takes a JSON array of arguments per method call and answers with either a reply or
//! a reject. It is not the replica's CBOR interface, so the host must point at such a gateway.
//! [`GameBackend`] is the capability the session calls into, and [`Connect`] is how a session
//! turns an identity into a backend handle.
//!
//! Outside the main network the gateway's status document is fetched before the first call. The
//! root key in it is kept on the agent but not checked against anything; the fetch only confirms
//! that the gateway answers and reports itself as a development network.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};
use ureq::Agent;

use crate::auth::Identity;
use crate::error::BackendError;

/// The name of the network where the root key is already known and must not be fetched.
const MAINNET: &str = "ic";

/// The capability to play rounds against the remote game backend.
pub trait GameBackend {
    /// Begins a new round and returns the backend's status message.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the call fails or is rejected.
    fn start_game(&mut self) -> Result<String, BackendError>;

    /// Submits a guess and returns the backend's status message.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the call fails or is rejected.
    fn guess(&mut self, number: u32) -> Result<String, BackendError>;
}

/// The capability to open a backend handle on behalf of an identity.
pub trait Connect {
    /// The kind of handle this connector opens.
    type Backend: GameBackend;

    /// Opens a backend handle that will make its calls as `identity`.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the handle cannot be trusted, for instance because the
    /// development root key could not be fetched.
    fn connect(&self, identity: &Identity) -> Result<Self::Backend, BackendError>;
}

/// This enum holds the gateway's answer to a method call.
#[derive(Deserialize)]
#[serde(untagged)]
enum CallReply<T> {
    /// The method ran and returned a value.
    Reply {
        /// The value returned by the method.
        reply: T,
    },
    /// The method was rejected.
    Reject {
        /// The reject code.
        reject_code: u32,
        /// The reason for the reject.
        reject_message: String,
    },
}

impl<T> CallReply<T> {
    /// Turns the reply into a result, mapping a reject into a [`BackendError`].
    fn into_result(self) -> Result<T, BackendError> {
        match self {
            Self::Reply { reply } => Ok(reply),
            Self::Reject {
                reject_code,
                reject_message,
            } => Err(BackendError::Rejected {
                code: reject_code,
                message: reject_message,
            }),
        }
    }
}

/// The gateway's status document.
#[derive(Deserialize)]
struct Status {
    /// The hex-encoded root key of the network.
    root_key: String,
}

/// An HTTP agent bound to a gateway host and an identity.
pub struct HttpAgent {
    /// The underlying HTTP agent.
    agent: Agent,
    /// The base URL of the gateway.
    host: String,
    /// The identity the calls are made as.
    identity: Identity,
    /// The root key of the network, once fetched.
    root_key: Option<String>,
}

impl HttpAgent {
    /// Creates an agent for the gateway at `host` that makes its calls as `identity`.
    #[must_use]
    pub fn new(agent: Agent, host: &str, identity: Identity) -> Self {
        Self {
            agent,
            host: host.trim_end_matches('/').to_owned(),
            identity,
            root_key: None,
        }
    }

    /// Fetches the network's root key from the gateway's status document. Only done outside the
    /// main network, where the key is not known ahead of time.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the status document cannot be fetched or read.
    pub fn fetch_root_key(&mut self) -> Result<&str, BackendError> {
        let status: Status = self
            .agent
            .get(format!("{}/api/v2/status", self.host))
            .call()?
            .into_body()
            .read_json()?;

        debug!(root_key = %status.root_key, "fetched root key");
        Ok(self.root_key.insert(status.root_key).as_str())
    }

    /// Returns the root key, if it has been fetched.
    #[must_use]
    pub fn root_key(&self) -> Option<&str> {
        self.root_key.as_deref()
    }

    /// Calls `method` on `canister` with the given arguments.
    fn call<T: DeserializeOwned>(
        &self,
        canister: &str,
        method: &str,
        args: &Value,
    ) -> Result<T, BackendError> {
        let reply: CallReply<T> = self
            .agent
            .post(format!("{}/api/v2/canister/{canister}/call/{method}", self.host))
            .header("Authorization", format!("Bearer {}", self.identity.token))
            .send_json(args)?
            .into_body()
            .read_json()?;

        reply.into_result()
    }
}

/// A handle to the game backend canister. Every call goes through the agent it was created with.
pub struct BackendActor {
    /// The agent the calls are dispatched through.
    agent: HttpAgent,
    /// The id of the backend canister.
    canister_id: String,
}

impl BackendActor {
    /// Creates a handle to `canister_id` that dispatches its calls through `agent`.
    #[must_use]
    pub fn new(agent: HttpAgent, canister_id: &str) -> Self {
        Self {
            agent,
            canister_id: canister_id.to_owned(),
        }
    }
}

impl GameBackend for BackendActor {
    #[instrument(skip(self), fields(canister = %self.canister_id))]
    fn start_game(&mut self) -> Result<String, BackendError> {
        let reply: String = self.agent.call(&self.canister_id, "startGame", &json!([]))?;
        debug!(%reply, "startGame replied");
        Ok(reply)
    }

    #[instrument(skip(self), fields(canister = %self.canister_id))]
    fn guess(&mut self, number: u32) -> Result<String, BackendError> {
        let reply: String = self.agent.call(&self.canister_id, "guess", &json!([number]))?;
        debug!(%reply, "guess replied");
        Ok(reply)
    }
}

/// Where and how backend handles are opened.
#[derive(Debug, Clone)]
pub struct ActorFactory {
    /// The id of the backend canister.
    pub canister_id: String,
    /// The base URL of the gateway.
    pub host: String,
    /// The name of the network; anything other than `ic` needs the root key fetched.
    pub network: String,
    /// The global timeout for each call, in seconds.
    pub timeout: Option<u64>,
}

impl ActorFactory {
    /// Returns whether handles opened by this factory need the root key fetched first.
    #[must_use]
    pub fn requires_root_key(&self) -> bool {
        self.network != MAINNET
    }

    /// Builds the HTTP agent shared by every call of one handle.
    fn http_agent(&self) -> Agent {
        Agent::new_with_config(
            Agent::config_builder()
                .timeout_global(self.timeout.map(Duration::from_secs))
                .build(),
        )
    }
}

impl Connect for ActorFactory {
    type Backend = BackendActor;

    fn connect(&self, identity: &Identity) -> Result<Self::Backend, BackendError> {
        let mut agent = HttpAgent::new(self.http_agent(), &self.host, identity.clone());

        if self.requires_root_key() {
            let _ = agent.fetch_root_key()?;
        }

        info!(
            canister = %self.canister_id,
            network = %self.network,
            principal = %identity.principal,
            "connected to the backend"
        );
        Ok(BackendActor::new(agent, &self.canister_id))
    }
}
