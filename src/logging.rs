//! This module sets up structured logging. The terminal is taken up by the game frame, so logs
//! either go to a file or, at a quieter default level, to stderr.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

/// The filter used when logging to a file and none is given.
const FILE_FILTER: &str = "info";

/// The filter used when logging to stderr and none is given.
const STDERR_FILTER: &str = "warn";

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if the filter does not parse, the log file cannot be opened, or a subscriber
/// was already installed.
pub(crate) fn init(file: Option<&Path>, filter: Option<&str>) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_target(false);

    match file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("could not open log file {}", path.display()))?;

            builder
                .with_env_filter(EnvFilter::try_new(filter.unwrap_or(FILE_FILTER))?)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|err| anyhow::anyhow!(err))
        }
        None => builder
            .with_env_filter(EnvFilter::try_new(filter.unwrap_or(STDERR_FILTER))?)
            .with_writer(io::stderr)
            .try_init()
            .map_err(|err| anyhow::anyhow!(err)),
    }
}
