//! File logging.
//!
//! The terminal belongs to the UI, so `tracing` output goes to
//! `storefront-tui.log` in the data directory.  `RUST_LOG` wins over
//! `STOREFRONT_LOG`; without either only this crate's `info` and above is
//! recorded.

use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::data_dir;

const LOG_ENV: &str = "STOREFRONT_LOG";
const LOG_FILE: &str = concat!(env!("CARGO_PKG_NAME"), ".log");

fn filter() -> EnvFilter {
    let directives = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var(LOG_ENV))
        .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")));
    EnvFilter::new(directives)
}

/// Install the global subscriber.  Returns the log file path.
pub fn initialize_logging() -> Result<PathBuf> {
    let directory = data_dir();
    fs::create_dir_all(&directory)
        .with_context(|| format!("creating {}", directory.display()))?;
    let log_path = directory.join(LOG_FILE);
    let log_file = File::create(&log_path)
        .with_context(|| format!("creating {}", log_path.display()))?;

    let file_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_filter(filter());

    tracing_subscriber::registry()
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(log_path)
}
