//! This module holds the command-line interface of the game. Every option can also be set through
//! an environment variable, so the values a local development network exports are picked up
//! without any flags.

use std::path::PathBuf;

use clap::Parser;

use crate::backend::ActorFactory;

/// This struct holds information about the application when it comes to the command-line argument
/// parser, which is clap.
#[derive(Parser, Debug)]
#[command(name = "guessing-number", version, about)]
#[command(next_line_help = true)]
pub(crate) struct Cli {
    /// The id of the game backend canister.
    #[arg(long, env = "CANISTER_ID_GUESSING_NUMBER_BACKEND", value_name = "CANISTER_ID")]
    pub(crate) canister_id: String,
    /// The base URL of the JSON gateway in front of the backend canister.
    #[arg(long, env = "GUESS_BACKEND_HOST", value_name = "URL")]
    pub(crate) host: String,
    /// The base URL of an identity provider serving the device login endpoints.
    #[arg(long, env = "GUESS_IDENTITY_PROVIDER", value_name = "URL")]
    pub(crate) identity_provider: String,
    /// Where to write logs. Without it, warnings and errors go to stderr.
    #[arg(long, env = "GUESS_LOG_FILE", value_name = "PATH")]
    pub(crate) log_file: Option<PathBuf>,
    /// The log filter, in `tracing` directive syntax.
    ///
    /// Defaults to `info` when logging to a file and `warn` when logging to stderr.
    #[arg(long, env = "GUESS_LOG", value_name = "FILTER")]
    pub(crate) log_level: Option<String>,
    /// The network the backend runs on. Anything other than `ic` fetches the root key from the
    /// gateway before the backend is trusted.
    #[arg(long, env = "DFX_NETWORK", value_name = "NAME", default_value = "local")]
    pub(crate) network: String,
    /// Where to keep the identity session between runs. Without it, the session ends with the
    /// process.
    #[arg(long, env = "GUESS_SESSION_FILE", value_name = "PATH")]
    pub(crate) session_file: Option<PathBuf>,
    /// The timeout for every remote call, in seconds. Without it, calls wait indefinitely.
    #[arg(long, env = "GUESS_TIMEOUT", value_name = "SECONDS")]
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub(crate) timeout: Option<u64>,
}

impl Cli {
    /// Returns the factory that opens backend handles with these settings.
    pub(crate) fn actor_factory(&self) -> ActorFactory {
        ActorFactory {
            canister_id: self.canister_id.clone(),
            host: self.host.clone(),
            network: self.network.clone(),
            timeout: self.timeout,
        }
    }
}
