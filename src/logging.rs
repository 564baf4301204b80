use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

pub const LOG_ENV: &str = "SUPPORT_CHAT_LOG";
const LOG_FILE: &str = "support-chat.log";

/// Send tracing output to a file; the terminal belongs to the TUI.
///
/// Returns the log path, or `None` when no file could be opened, in which
/// case the app runs without logging.
pub fn init() -> Option<PathBuf> {
    let path = Config::get_config_dir().ok()?.join(LOG_FILE);
    match init_at(&path) {
        Ok(()) => Some(path),
        Err(_) => None,
    }
}

fn init_at(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "logging to {}", path.display());
    Ok(())
}
