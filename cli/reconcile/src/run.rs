//! Main execution logic for the nr CLI.

use anyhow::{Context, Result};
use nr_reconcile::{
    GenerationReport, PairStatus, ReconcileConfig, ReconciliationReport, Reconciler,
    ReleaseWindow, StatsSnapshot, aggregate_by_table_op, derive_mappings, find_release, io,
    release_op_counts,
};
use nr_store_local::LocalStore;
use nr_store_s3::{RetryConfig, S3Config, S3Store};
use nr_traits::ObjectStore;
use nr_types::{FileSizes, Notification, OpCount, RecordCounts, ReleaseMapping};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::args::{
    Cli, Command, ComparePairsArgs, CountsArgs, DeriveMappingsArgs, EngineArgs, GenerateArgs,
    RegenerateArgs, StoreArgs, ValidateArgs, WindowArgs,
};

/// What a run produced, for the summary on stderr.
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Engine statistics, when the command touched the store
    pub stats: Option<StatsSnapshot>,

    /// Failed releases and mismatching pairs
    pub problems: Vec<String>,
}

impl RunOutcome {
    fn finished(reconciler: &Reconciler, problems: Vec<String>) -> Self {
        Self {
            stats: Some(reconciler.stats().snapshot()),
            problems,
        }
    }

    /// Whether the run should exit with the partial failure code.
    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }
}

/// Counts of one release.
#[derive(Debug, Serialize)]
struct ReleaseCounts {
    release_date: String,
    bucket: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    record_counts: Option<RecordCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    op_counts: Option<Vec<OpCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_sizes: Option<FileSizes>,
}

/// Execute the command named by the arguments.
pub async fn execute(cli: Cli) -> Result<RunOutcome> {
    match cli.command {
        Command::Generate(args) => generate(&cli.store, &cli.engine, args).await,
        Command::DeriveMappings(args) => derive(args).await,
        Command::Validate(args) => validate(&cli.store, &cli.engine, args).await,
        Command::Regenerate(args) => regenerate(&cli.store, &cli.engine, args).await,
        Command::ComparePairs(args) => compare_pairs(&cli.store, &cli.engine, args).await,
        Command::Counts(args) => counts(&cli.store, &cli.engine, args).await,
    }
}

/// Open the folder store or the S3 store.
async fn open_store(args: &StoreArgs) -> Result<Arc<dyn ObjectStore>> {
    if let Some(root) = &args.local_root {
        info!(root = %root.display(), "Reading releases from local folder");
        return Ok(Arc::new(LocalStore::new(root)));
    }

    let mut config = S3Config::new()
        .with_region(&args.region)
        .with_timeout(args.s3_timeout);

    if let Some(endpoint) = &args.s3_endpoint {
        config = config.with_endpoint(endpoint);
    }

    if let (Some(access_key), Some(secret_key)) = (&args.access_key, &args.secret_key) {
        config = config.with_credentials(access_key, secret_key);
    }

    if let Some(profile) = &args.profile {
        config = config.with_profile(profile);
    }

    let store = S3Store::from_config(&config)
        .await?
        .with_retry(RetryConfig::new().with_max_retries(args.max_retries));
    Ok(Arc::new(store))
}

async fn build_reconciler(
    store: &StoreArgs,
    engine: &EngineArgs,
    bucket: Option<&str>,
    verify_dates: bool,
) -> Result<Reconciler> {
    let mut config = ReconcileConfig::new(bucket.unwrap_or_default())
        .with_count_concurrency(engine.concurrency)
        .with_verify_mapping_dates(verify_dates);

    if let Some(dir) = &engine.cache_dir {
        config = config.with_cache_dir(dir);
    }
    if let Some(path) = &engine.exclusions_log {
        config = config.with_exclusions_log(path);
    }

    let store = open_store(store).await?;
    Ok(Reconciler::from_config(store, config)?)
}

fn window(args: &WindowArgs) -> Result<ReleaseWindow> {
    Ok(ReleaseWindow::parse(
        args.from.as_deref(),
        args.to.as_deref(),
    )?)
}

async fn read_mappings(path: &Path) -> Result<Vec<ReleaseMapping>> {
    io::read_mappings(path)
        .await
        .with_context(|| format!("failed to read mappings from {}", path.display()))
}

async fn read_notifications(path: &Path) -> Result<Vec<Notification>> {
    io::read_notifications(path)
        .await
        .with_context(|| format!("failed to read notifications from {}", path.display()))
}

async fn generate(store: &StoreArgs, engine: &EngineArgs, args: GenerateArgs) -> Result<RunOutcome> {
    let mappings = window(&args.window)?.filter(read_mappings(&args.mappings).await?)?;
    let reconciler =
        build_reconciler(store, engine, Some(args.bucket.as_str()), !args.no_verify_dates).await?;

    let report = reconciler.generate_from_mappings(&mappings).await?;
    write_notifications(args.output.as_deref(), &report.notifications).await?;

    Ok(RunOutcome::finished(&reconciler, generation_problems(&report)))
}

async fn derive(args: DeriveMappingsArgs) -> Result<RunOutcome> {
    let notifications = read_notifications(&args.notifications).await?;
    let mappings = derive_mappings(&notifications)?;

    match &args.output {
        Some(path) => io::write_mappings(path, &mappings).await?,
        None => write_stdout(&io::format_mappings(&mappings)).await?,
    }

    info!(mappings = mappings.len(), "Derived release mappings");
    Ok(RunOutcome::default())
}

async fn validate(store: &StoreArgs, engine: &EngineArgs, args: ValidateArgs) -> Result<RunOutcome> {
    let window = window(&args.window)?;
    let received = window.filter_notifications(read_notifications(&args.received).await?)?;
    let reconciler = build_reconciler(
        store,
        engine,
        args.bucket.as_deref(),
        !args.no_verify_dates,
    )
    .await?;

    let report = match &args.mappings {
        Some(path) => {
            let mappings = window.filter(read_mappings(path).await?)?;
            reconciler.reconcile_window(&mappings, &received).await?
        }
        None => reconciler.validate_received(&received).await?,
    };

    write_json(args.report.as_deref(), &report).await?;
    if let Some(path) = &args.generated {
        io::write_notifications(path, &report.generated()).await?;
    }

    Ok(RunOutcome::finished(&reconciler, reconciliation_problems(&report)))
}

async fn regenerate(
    store: &StoreArgs,
    engine: &EngineArgs,
    args: RegenerateArgs,
) -> Result<RunOutcome> {
    let received =
        window(&args.window)?.filter_notifications(read_notifications(&args.received).await?)?;
    let reconciler = build_reconciler(store, engine, None, true).await?;

    let report = reconciler.regenerate(&received).await?;
    write_notifications(args.output.as_deref(), &report.notifications).await?;

    Ok(RunOutcome::finished(&reconciler, generation_problems(&report)))
}

async fn compare_pairs(
    store: &StoreArgs,
    engine: &EngineArgs,
    args: ComparePairsArgs,
) -> Result<RunOutcome> {
    let before = read_notifications(&args.before).await?;
    let after = match &args.after {
        Some(path) => read_notifications(path).await?,
        None => before.clone(),
    };

    let mut pairs = Vec::with_capacity(args.pairs.len());
    for spec in &args.pairs {
        let first = find_release(&before, &spec.first.release_date, spec.first.occurrence)
            .with_context(|| format!("release {} not found in --before", spec.first))?;
        let second = find_release(&after, &spec.second.release_date, spec.second.occurrence)
            .with_context(|| format!("release {} not found in --after", spec.second))?;
        pairs.push((first.clone(), second.clone()));
    }

    let reconciler = build_reconciler(store, engine, None, true).await?;
    let reports = reconciler.compare_release_pairs(&pairs).await?;

    for (spec, report) in args.pairs.iter().zip(&reports) {
        if report.op_counts_match() {
            info!(first = %spec.first, second = %spec.second, "Operation counts match");
        } else {
            let tables: Vec<&str> = report.tables_in_diff().into_iter().collect();
            info!(first = %spec.first, second = %spec.second, tables = ?tables, "Operation counts differ");
        }
    }

    write_json(args.report.as_deref(), &reports).await?;
    if let Some(path) = &args.summary {
        io::write_json_report(path, &release_op_counts(&reports)).await?;
    }

    Ok(RunOutcome::finished(&reconciler, Vec::new()))
}

async fn counts(store: &StoreArgs, engine: &EngineArgs, args: CountsArgs) -> Result<RunOutcome> {
    let notifications = read_notifications(&args.notifications).await?;
    let selected: Vec<&Notification> = match &args.release_date {
        Some(date) => vec![find_release(&notifications, date, args.occurrence)?],
        None => notifications.iter().collect(),
    };

    let reconciler = build_reconciler(store, engine, None, true).await?;
    let counter = reconciler.counter();

    let mut results = Vec::with_capacity(selected.len());
    for notification in selected {
        let mut counts = ReleaseCounts {
            release_date: notification.release_date.clone(),
            bucket: notification.bucket.clone(),
            record_counts: None,
            op_counts: None,
            file_sizes: None,
        };
        if args.sizes {
            counts.file_sizes = Some(
                counter
                    .file_sizes(&notification.bucket, &notification.files)
                    .await?,
            );
        } else {
            let records = counter
                .count_lines(&notification.bucket, &notification.files)
                .await?;
            counts.op_counts = Some(aggregate_by_table_op(&records));
            counts.record_counts = Some(records);
        }
        results.push(counts);
    }

    write_json(args.output.as_deref(), &results).await?;
    Ok(RunOutcome::finished(&reconciler, Vec::new()))
}

fn generation_problems(report: &GenerationReport) -> Vec<String> {
    report
        .failures
        .iter()
        .map(|failure| {
            format!(
                "release {} ({}): {}",
                failure.release_date,
                failure.release_dir.as_deref().unwrap_or("unknown directory"),
                failure.error
            )
        })
        .collect()
}

fn reconciliation_problems(report: &ReconciliationReport) -> Vec<String> {
    report
        .pairs
        .iter()
        .filter_map(|pair| match &pair.status {
            PairStatus::Matched => None,
            PairStatus::Mismatched { cause } => Some(format!(
                "pair {} ({}): {}",
                pair.index, pair.release_date, cause
            )),
            PairStatus::Failed { error, .. } => Some(format!(
                "pair {} ({}): {}",
                pair.index, pair.release_date, error
            )),
        })
        .collect()
}

async fn write_notifications(path: Option<&Path>, notifications: &[Notification]) -> Result<()> {
    match path {
        Some(path) => io::write_notifications(path, notifications).await?,
        None => write_stdout(&io::format_notifications(notifications)?).await?,
    }
    Ok(())
}

async fn write_json<T: Serialize + ?Sized>(path: Option<&Path>, value: &T) -> Result<()> {
    match path {
        Some(path) => io::write_json_report(path, value).await?,
        None => {
            let mut json = serde_json::to_string_pretty(value)?;
            json.push('\n');
            write_stdout(&json).await?;
        }
    }
    Ok(())
}

async fn write_stdout(content: &str) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(content.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
