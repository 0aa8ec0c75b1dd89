//! `tracing` subscriber setup.
//!
//! Records go to the configured log file (appended, no colour) or to stderr.
//! `RUST_LOG` overrides the configured level.  Without either, logging is off
//! on stderr and at `info` for a log file.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum LogError {
    #[error("cannot open log file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Filter directive used when `RUST_LOG` is unset.
pub fn default_directive(level: Option<&str>, to_file: bool) -> String {
    match level {
        Some(l) if !l.trim().is_empty() => l.trim().to_owned(),
        _ if to_file => "info".to_owned(),
        _ => "off".to_owned(),
    }
}

/// Install the global subscriber.
pub fn init(level: Option<&str>, log_file: Option<&Path>) -> Result<(), LogError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level, log_file.is_some())));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LogError::Open { path: path.to_owned(), source })?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()?;
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
                .try_init()?;
        }
    }
    Ok(())
}
