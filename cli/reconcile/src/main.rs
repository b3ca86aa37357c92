//! nr CLI
//!
//! Regenerates, validates and compares release notifications.

use clap::Parser;
use nr_cli_common::{format_bytes, format_count, format_duration, init_logging};
use std::time::Duration;

mod args;
mod run;

use args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Logs go to stderr; stdout carries notifications and reports
    init_logging(args.log_level)?;

    let outcome = run::execute(args).await?;

    if let Some(stats) = &outcome.stats {
        eprintln!();
        eprintln!("Run completed:");
        eprintln!("  Keys listed:       {}", format_count(stats.keys_listed));
        eprintln!("  Keys excluded:     {}", format_count(stats.keys_excluded));
        eprintln!("  Releases built:    {}", stats.releases_built);
        eprintln!("  Releases failed:   {}", stats.releases_failed);
        eprintln!("  Pairs matched:     {}", stats.pairs_matched);
        eprintln!("  Pairs mismatched:  {}", stats.pairs_mismatched);
        eprintln!("  Files counted:     {}", format_count(stats.files_counted));
        eprintln!("  Records counted:   {}", format_count(stats.lines_counted));
        eprintln!("  Cache hits:        {}", format_count(stats.cache_hits));
        eprintln!(
            "  Downloaded:        {}",
            format_bytes(stats.bytes_downloaded)
        );
        eprintln!(
            "  Duration:          {}",
            format_duration(Duration::from_millis(stats.duration_ms))
        );
    }

    if outcome.has_problems() {
        for problem in &outcome.problems {
            eprintln!("  Problem: {}", problem);
        }
        std::process::exit(4); // Partial failure
    }

    Ok(())
}
