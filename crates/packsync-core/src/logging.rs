//! Logging init.
//!
//! Commands that work on a server directory keep a log inside it
//! (`<dir>/packsync.log`, rewritten on every run) and echo warnings to stderr.
//! Commands that only inspect files log to stderr, quietly by default.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Name of the per-install log file. Install planning ignores it when
/// deciding whether a directory is empty.
pub const LOG_FILE_NAME: &str = "packsync.log";

const FILE_FILTER: &str = "info,packsync=debug,packsync_core=debug";
const CONSOLE_FILTER: &str = "warn";
const FALLBACK_FILTER: &str = "info";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

pub fn log_path(install_dir: &Path) -> PathBuf {
    install_dir.join(LOG_FILE_NAME)
}

/// Log to `<install_dir>/packsync.log`, creating the directory if needed.
/// Warnings and errors also go to stderr. Returns Err (nothing installed) when
/// the file cannot be created, so the caller can use [`init_logging_stderr`].
pub fn init_logging(install_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(install_dir).with_context(|| format!("create {}", install_dir.display()))?;
    let path = log_path(install_dir);
    let file = fs::File::create(&path).with_context(|| format!("open log {}", path.display()))?;
    let writer = Mutex::new(file).and(io::stderr.with_max_level(Level::WARN));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(FILE_FILTER))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("install log subscriber: {}", e))?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "packsync log at {}", path.display());
    Ok(path)
}

/// Log to stderr only. `verbose` is for directory commands whose log file
/// could not be opened; inspection commands pass `false`.
pub fn init_logging_stderr(verbose: bool) {
    let default = if verbose { FALLBACK_FILTER } else { CONSOLE_FILTER };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default))
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}
