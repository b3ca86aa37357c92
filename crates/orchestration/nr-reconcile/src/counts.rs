//! Record counting and aggregation.
//!
//! A record is a non-empty line of a diff file. Counts are collected per
//! object key, then summed by table and operation for comparison across
//! releases.

use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt, stream};
use nr_error::{NrError, Result};
use nr_traits::ObjectStore;
use nr_types::{FileSizes, KeyClass, OpCount, Operation, RecordCounts, strip_first_segment};
use std::collections::{HashMap, HashSet};
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::cache::LocalObjectCache;
use crate::diff::{DiffResult, multiset_diff};
use crate::memo::CountMemo;
use crate::stats::ReconcileStats;

/// Default number of objects counted concurrently.
pub const DEFAULT_COUNT_CONCURRENCY: usize = 8;

/// Incremental counter of non-empty lines.
///
/// Lines are split on `\n` across chunk boundaries; a line counts if it is
/// not blank after trimming whitespace (including a trailing `\r`).
#[derive(Debug, Default)]
pub struct LineCounter {
    partial: Vec<u8>,
    count: u64,
}

impl LineCounter {
    /// Create a counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of the object.
    pub fn feed(&mut self, chunk: &[u8]) {
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (line, tail) = rest.split_at(pos);
            if self.partial.is_empty() {
                self.count_line(line);
            } else {
                self.partial.extend_from_slice(line);
                let joined = std::mem::take(&mut self.partial);
                self.count_line(&joined);
            }
            rest = &tail[1..];
        }
        self.partial.extend_from_slice(rest);
    }

    /// Count the unterminated last line, if any, and return the total.
    pub fn finish(mut self) -> u64 {
        let last = std::mem::take(&mut self.partial);
        self.count_line(&last);
        self.count
    }

    fn count_line(&mut self, line: &[u8]) {
        if !String::from_utf8_lossy(line).trim().is_empty() {
            self.count += 1;
        }
    }
}

/// Count non-empty lines in a byte stream.
pub async fn count_stream<S>(mut body: S) -> Result<u64>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let mut counter = LineCounter::new();
    while let Some(chunk) = body.next().await {
        counter.feed(&chunk?);
    }
    Ok(counter.finish())
}

/// Counts records in objects of a store.
///
/// Counts are memoized in an injected [`CountMemo`]. With a
/// [`LocalObjectCache`] attached, objects are downloaded once and read from
/// disk; otherwise they are streamed from the store.
#[derive(Clone)]
pub struct RecordCounter {
    store: Arc<dyn ObjectStore>,
    cache: Option<Arc<LocalObjectCache>>,
    memo: Arc<CountMemo>,
    stats: Arc<ReconcileStats>,
    concurrency: usize,
}

impl std::fmt::Debug for RecordCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCounter")
            .field("backend", &self.store.backend())
            .field("cache", &self.cache)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl RecordCounter {
    /// Create a counter streaming directly from `store`.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            cache: None,
            memo: Arc::new(CountMemo::new()),
            stats: Arc::new(ReconcileStats::new()),
            concurrency: DEFAULT_COUNT_CONCURRENCY,
        }
    }

    /// Read objects through a local cache.
    pub fn with_cache(mut self, cache: Arc<LocalObjectCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use a caller-owned memo.
    pub fn with_memo(mut self, memo: Arc<CountMemo>) -> Self {
        self.memo = memo;
        self
    }

    /// Record counters in `stats`.
    pub fn with_stats(mut self, stats: Arc<ReconcileStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Set how many objects are counted at once (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The memo holding counts computed so far.
    pub fn memo(&self) -> &Arc<CountMemo> {
        &self.memo
    }

    /// Count non-empty lines in one object.
    pub async fn count_file(&self, bucket: &str, key: &str) -> Result<u64> {
        self.count_file_with(bucket, key, true).await
    }

    /// Count non-empty lines in one object, reading it through the local
    /// cache only when `cache_locally` is set and a cache is attached.
    pub async fn count_file_with(&self, bucket: &str, key: &str, cache_locally: bool) -> Result<u64> {
        if let Some(count) = self.memo.get(bucket, key) {
            self.stats.record_cache_hit();
            return Ok(count);
        }

        let cache = self.cache.as_ref().filter(|_| cache_locally);
        let count = match cache {
            Some(cache) => {
                let cached = cache.fetch(self.store.as_ref(), bucket, key).await?;
                if cached.reused {
                    self.stats.record_cache_hit();
                } else {
                    self.stats.record_download(cached.size);
                }
                let file = tokio::fs::File::open(&cached.path).await?;
                count_stream(ReaderStream::new(file).map_err(NrError::from)).await?
            }
            None => count_stream(self.store.read_object(bucket, key).await?).await?,
        };

        debug!(bucket, key, count, "Counted records");
        self.memo.insert(bucket, key, count);
        self.stats.record_file_counted(count);
        Ok(count)
    }

    /// Count non-empty lines for each file, keyed by file in input order.
    ///
    /// A file listed twice appears once in the result and is counted once.
    pub async fn count_lines(&self, bucket: &str, files: &[String]) -> Result<RecordCounts> {
        self.count_lines_with(bucket, files, true).await
    }

    /// [`count_lines`](Self::count_lines) with local caching chosen per call.
    pub async fn count_lines_with(
        &self,
        bucket: &str,
        files: &[String],
        cache_locally: bool,
    ) -> Result<RecordCounts> {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = files.iter().filter(|key| seen.insert(key.as_str())).collect();

        let counted: Vec<(String, u64)> = stream::iter(unique)
            .map(|key| async move {
                let count = self.count_file_with(bucket, key, cache_locally).await?;
                Ok::<_, NrError>((key.clone(), count))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(counted.into_iter().collect())
    }

    /// Size in bytes of each file, keyed by file in input order.
    pub async fn file_sizes(&self, bucket: &str, files: &[String]) -> Result<FileSizes> {
        let sizes: Vec<(String, u64)> = stream::iter(files)
            .map(|key| async move {
                let size = self.store.object_size(bucket, key).await?;
                Ok::<_, NrError>((key.clone(), size))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(sizes.into_iter().collect())
    }
}

/// Sum diff-file counts by table and operation.
///
/// Markers and excluded key shapes contribute nothing. Tables are emitted in
/// order of first occurrence, and operations within a table likewise.
pub fn aggregate_by_table_op(counts: &RecordCounts) -> Vec<OpCount> {
    let mut entries: Vec<OpCount> = Vec::new();
    let mut groups: HashMap<(String, Operation), usize> = HashMap::new();
    let mut table_order: HashMap<String, usize> = HashMap::new();

    for (key, count) in counts.iter() {
        let KeyClass::DiffFile(diff) = KeyClass::of(key) else {
            continue;
        };

        let next_table = table_order.len();
        table_order.entry(diff.table.to_string()).or_insert(next_table);

        match groups.entry((diff.table.to_string(), diff.operation)) {
            Entry::Occupied(group) => entries[*group.get()].count += count,
            Entry::Vacant(group) => {
                group.insert(entries.len());
                entries.push(OpCount::new(diff.table, diff.operation, count));
            }
        }
    }

    entries.sort_by_key(|entry| table_order.get(&entry.table).copied().unwrap_or(usize::MAX));
    entries
}

/// Diff per-file counts of two releases with the release directory removed
/// from each key, so the same file in both releases lines up.
pub fn relative_count_diff(
    a: &RecordCounts,
    b: &RecordCounts,
) -> DiffResult<(String, u64)> {
    let relative = |counts: &RecordCounts| -> Vec<(String, u64)> {
        counts
            .iter()
            .map(|(key, count)| (strip_first_segment(key).to_string(), count))
            .collect()
    };
    multiset_diff(&relative(a), &relative(b))
}
