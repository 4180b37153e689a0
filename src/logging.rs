//! tracing subscriber setup.
//!
//! The TUI owns the terminal, so interactive sessions log to a file; headless
//! modes log to stderr.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub(crate) enum LogTarget<'a> {
    File(&'a Path),
    Stderr,
    /// Silent mode: errors only, on stderr.
    ErrorsOnly,
}

/// `<state dir>/task-runner/task-runner.log`, falling back to the local data dir.
pub(crate) fn default_log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("task-runner")
        .join("task-runner.log")
}

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

pub(crate) fn init(target: LogTarget<'_>) -> Result<()> {
    let res = match target {
        LogTarget::File(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("create log directory {}", dir.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter("info"))
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .try_init()
        }
        LogTarget::Stderr => tracing_subscriber::fmt()
            .with_env_filter(filter("warn"))
            .with_writer(std::io::stderr)
            .try_init(),
        LogTarget::ErrorsOnly => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("error"))
            .with_writer(std::io::stderr)
            .try_init(),
    };
    res.map_err(|e| anyhow::anyhow!("install log subscriber: {e}"))?;
    tracing::info!("task-runner v{} starting", env!("CARGO_PKG_VERSION"));
    Ok(())
}
