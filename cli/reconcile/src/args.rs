//! Command line arguments for nr.

use clap::{Args, Parser, Subcommand};
use nr_cli_common::LogLevel;
use nr_reconcile::DEFAULT_COUNT_CONCURRENCY;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Release notification reconciler.
///
/// Regenerates release notifications from the files in an object store,
/// compares them with the notifications an external system received, and
/// compares record counts between releases.
///
/// ## Examples
///
/// Regenerate notifications for a mapping file:
///   nr generate -b ingest-results --mappings release_mappings.txt
///
/// Validate received notifications against the bucket:
///   nr validate --received received.ndjson --report report.json
///
/// Compare two releases from a local mirror:
///   nr --local-root ./mirror compare-pairs --before received.ndjson \
///      --pair 2022-06-19:2022-06-20
#[derive(Parser, Debug)]
#[command(name = "nr", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Log level (RUST_LOG takes precedence when set)
    #[arg(long, default_value = "info", env = "NR_LOG_LEVEL")]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

/// Where release objects are read from.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    // === Local Mirror ===
    /// Read buckets from `<DIR>/<bucket>/<key>` instead of S3
    #[arg(long, env = "NR_LOCAL_ROOT")]
    pub local_root: Option<PathBuf>,

    // === S3 Configuration ===
    /// Custom S3 endpoint URL (for LocalStack or S3-compatible services)
    #[arg(long, env = "NR_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    // === AWS Credentials ===
    /// AWS access key ID
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    pub access_key: Option<String>,

    /// AWS secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY")]
    pub secret_key: Option<String>,

    /// AWS profile name
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    // === Request Behavior ===
    /// S3 request timeout in seconds
    #[arg(long, default_value = "30")]
    pub s3_timeout: u64,

    /// Retries for transient S3 errors
    #[arg(long, default_value = "3")]
    pub max_retries: u32,
}

/// Engine settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Number of objects counted concurrently
    #[arg(short = 'c', long, env = "NR_CONCURRENCY", default_value_t = DEFAULT_COUNT_CONCURRENCY, value_parser = parse_positive_usize)]
    pub concurrency: usize,

    /// Cache downloaded objects under this directory
    #[arg(long, env = "NR_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Append excluded keys to this file
    #[arg(long, env = "NR_EXCLUSIONS_LOG")]
    pub exclusions_log: Option<PathBuf>,
}

/// Inclusive release date window.
#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    /// First release date included (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Last release date included (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate notifications from a release mapping file
    Generate(GenerateArgs),

    /// Write a release mapping file from trusted notifications
    DeriveMappings(DeriveMappingsArgs),

    /// Compare received notifications with bucket state
    Validate(ValidateArgs),

    /// Rebuild received notifications from their own bucket and directory
    Regenerate(RegenerateArgs),

    /// Compare record counts between pairs of releases
    ComparePairs(ComparePairsArgs),

    /// Count records or file sizes of releases
    Counts(CountsArgs),
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Bucket holding the mapped releases
    #[arg(short, long, env = "NR_BUCKET")]
    pub bucket: String,

    /// Release mapping file (`release_date release_dir` per line)
    #[arg(short, long)]
    pub mappings: PathBuf,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Accept releases whose marker date differs from the mapping
    #[arg(long)]
    pub no_verify_dates: bool,

    /// Output file for newline-delimited notifications (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DeriveMappingsArgs {
    /// Newline-delimited notification file
    #[arg(short, long)]
    pub notifications: PathBuf,

    /// Output mapping file (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Newline-delimited notifications received from the external system
    #[arg(short, long)]
    pub received: PathBuf,

    /// Pair received notifications with these mappings by position
    /// instead of using each notification's own directory
    #[arg(short, long, requires = "bucket")]
    pub mappings: Option<PathBuf>,

    /// Bucket holding the mapped releases
    #[arg(short, long, env = "NR_BUCKET")]
    pub bucket: Option<String>,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Accept releases whose marker date differs from the mapping
    #[arg(long)]
    pub no_verify_dates: bool,

    /// Output file for the JSON report (stdout if omitted)
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Also write the generated notifications to this file
    #[arg(long)]
    pub generated: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RegenerateArgs {
    /// Newline-delimited notifications received from the external system
    #[arg(short, long)]
    pub received: PathBuf,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Output file for regenerated notifications (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ComparePairsArgs {
    /// Notifications holding the first release of each pair
    #[arg(long)]
    pub before: PathBuf,

    /// Notifications holding the second release of each pair
    /// (defaults to --before)
    #[arg(long)]
    pub after: Option<PathBuf>,

    /// Release pair as `FIRST:SECOND`, each a release date with an
    /// optional `#N` occurrence (e.g. `2022-06-26#1:2022-06-27`)
    #[arg(long = "pair", required = true, value_parser = parse_pair_spec)]
    pub pairs: Vec<PairSpec>,

    /// Output file for the JSON pair reports (stdout if omitted)
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Also write `{release_date, op_counts}` of each second release here
    #[arg(long)]
    pub summary: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CountsArgs {
    /// Newline-delimited notification file
    #[arg(short, long)]
    pub notifications: PathBuf,

    /// Only count the release with this date
    #[arg(long)]
    pub release_date: Option<String>,

    /// Which notification to use when a release date repeats (0-based)
    #[arg(long, default_value = "0")]
    pub occurrence: usize,

    /// Report byte sizes instead of record counts
    #[arg(long)]
    pub sizes: bool,

    /// Output file for the JSON counts (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// A release date and which of its notifications to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRef {
    pub release_date: String,
    pub occurrence: usize,
}

impl FromStr for ReleaseRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (date, occurrence) = match s.split_once('#') {
            Some((date, n)) => {
                let occurrence = n
                    .parse()
                    .map_err(|_| format!("'{}' is not a valid occurrence", n))?;
                (date, occurrence)
            }
            None => (s, 0),
        };
        if date.is_empty() {
            return Err(format!("'{}' has no release date", s));
        }
        Ok(Self {
            release_date: date.to_string(),
            occurrence,
        })
    }
}

impl fmt::Display for ReleaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.occurrence == 0 {
            write!(f, "{}", self.release_date)
        } else {
            write!(f, "{}#{}", self.release_date, self.occurrence)
        }
    }
}

/// Two releases to compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSpec {
    pub first: ReleaseRef,
    pub second: ReleaseRef,
}

/// Parse `FIRST:SECOND`.
fn parse_pair_spec(s: &str) -> Result<PairSpec, String> {
    let (first, second) = s
        .split_once(':')
        .ok_or_else(|| format!("'{}' is not of the form FIRST:SECOND", s))?;
    Ok(PairSpec {
        first: first.parse()?,
        second: second.parse()?,
    })
}

/// Parse a positive usize (>= 1).
fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if value < 1 {
        return Err(format!("{} is not in 1..", value));
    }
    Ok(value)
}
