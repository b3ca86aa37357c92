//! Logging initialization utilities.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::LogLevel;

/// Initialize logging at `level`, unless `RUST_LOG` is set.
///
/// Logs go to stderr; stdout carries notifications and reports.
pub fn init_logging(level: LogLevel) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))
}
