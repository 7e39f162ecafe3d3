use std::{env, fs::OpenOptions, sync::Mutex};

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LOG_FILE_VAR;

/// Install a file-backed subscriber when `TRASHCAL_LOG_FILE` is set.
///
/// The terminal belongs to the UI, so nothing is logged without a file.
pub(crate) fn init_logging() -> Result<()> {
    let Some(path) = env::var_os(LOG_FILE_VAR) else {
        return Ok(());
    };
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| anyhow!(err))
}
