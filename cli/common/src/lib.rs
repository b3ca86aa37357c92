//! Shared utilities for the `nr` command line tool.
//!
//! Log level selection, logging setup, and human-readable formatting for
//! the run summary printed on stderr.

pub mod args;
pub mod format;
pub mod logging;

pub use args::LogLevel;
pub use format::{format_bytes, format_count, format_duration};
pub use logging::init_logging;
