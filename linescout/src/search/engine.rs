use crossbeam_channel::{bounded, Receiver};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, trace};

use super::aggregator::ResultAggregator;
use super::cache::{CompiledPattern, PatternCache};
use super::scanner::FileScanner;
use super::walker::TreeWalker;
use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::SearchMetrics;
use crate::results::{Match, SearchOutput, SearchQuery};

/// Lifecycle of a single query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Compiling,
    Scanning,
    Aggregating,
    Done,
    Failed,
}

impl SearchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether the state machine may move from `self` to `next`
    pub fn can_advance_to(self, next: SearchState) -> bool {
        use SearchState::*;
        matches!(
            (self, next),
            (Idle, Compiling)
                | (Compiling, Scanning)
                | (Scanning, Aggregating)
                | (Aggregating, Done)
                | (Compiling | Scanning | Aggregating, Failed)
        )
    }
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Compiling => "compiling",
            Self::Scanning => "scanning",
            Self::Aggregating => "aggregating",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks and logs the state transitions of one query
#[derive(Debug)]
struct QueryRun {
    id: u64,
    state: SearchState,
}

impl QueryRun {
    fn new(id: u64) -> Self {
        Self {
            id,
            state: SearchState::Idle,
        }
    }

    fn advance(&mut self, next: SearchState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!("Query {}: {} -> {}", self.id, self.state, next);
        self.state = next;
    }

    fn fail(&mut self, err: SearchError) -> SearchError {
        debug!("Query {} failed: {}", self.id, err);
        self.advance(SearchState::Failed);
        err
    }
}

/// One file handed from the walker to a scanner worker
#[derive(Debug)]
struct WorkItem {
    ordinal: usize,
    path: PathBuf,
    pattern: CompiledPattern,
}

/// Runs regex searches over file trees on a fixed-size worker pool.
///
/// One engine is meant to be shared by every caller of a process (it is
/// `Send + Sync`); concurrent queries each get their own aggregator and work
/// queue and only share the pattern cache.
///
/// # Example
///
/// ```rust,no_run
/// use linescout::{SearchConfig, SearchEngine, SearchQuery};
///
/// let engine = SearchEngine::new(SearchConfig::default())?;
/// let query = SearchQuery::new(r"^func\s+\w+", vec!["./src".to_string()], 10);
/// let output = engine.search_uncancellable(&query)?;
/// for m in &output.matches {
///     println!("{}:{}: {}", m.file, m.line, m.content);
/// }
/// # Ok::<(), linescout::SearchError>(())
/// ```
#[derive(Debug)]
pub struct SearchEngine {
    config: SearchConfig,
    pool: ThreadPool,
    cache: PatternCache,
    scanner: FileScanner,
    metrics: SearchMetrics,
    next_query_id: AtomicU64,
}

impl SearchEngine {
    pub fn new(config: SearchConfig) -> SearchResult<Self> {
        let workers = config.thread_count.get();
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("linescout-worker-{i}"))
            .build()
            .map_err(|e| SearchError::config_error(format!("failed to build worker pool: {e}")))?;

        let metrics = SearchMetrics::new();
        debug!("Search engine started with {} workers", workers);

        Ok(Self {
            cache: PatternCache::with_metrics(config.pattern_cache_capacity, metrics.clone()),
            scanner: FileScanner::new(config.encoding_mode),
            pool,
            metrics,
            config,
            next_query_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Counters accumulated across every query run by this engine
    pub fn metrics(&self) -> &SearchMetrics {
        &self.metrics
    }

    pub fn cache(&self) -> &PatternCache {
        &self.cache
    }

    /// Runs a query without a way to cancel it
    pub fn search_uncancellable(&self, query: &SearchQuery) -> SearchResult<SearchOutput> {
        self.search(query, &CancellationToken::new())
    }

    /// Runs one query to completion.
    ///
    /// Returns the first `max_results` matches in traversal order (files in
    /// walk order, lines in file order). Unreadable files and walk errors are
    /// logged and skipped. Only an invalid query, an invalid pattern or
    /// cancellation through `cancel` fail the query; a cancelled query
    /// discards whatever it had collected.
    pub fn search(
        &self,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> SearchResult<SearchOutput> {
        let id = self.next_query_id.fetch_add(1, Ordering::Relaxed);
        let span = info_span!("search", query = id);
        let _enter = span.enter();

        info!(
            "Starting search for {:?} in {} path(s)",
            query.pattern,
            query.paths.len()
        );

        let result = self.run(QueryRun::new(id), query, cancel);
        self.metrics.record_query(result.is_ok());
        self.metrics.log_stats();

        match &result {
            Ok(output) => info!("Search complete. Found {} matches", output.total),
            Err(e) => info!("Search failed: {}", e),
        }
        result
    }

    fn run(
        &self,
        mut run: QueryRun,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> SearchResult<SearchOutput> {
        run.advance(SearchState::Compiling);
        let limit = query
            .effective_limit(self.config.default_max_results)
            .map_err(|e| run.fail(e))?;
        let pattern = self.cache.compile(&query.pattern).map_err(|e| run.fail(e))?;
        if cancel.is_cancelled() {
            return Err(run.fail(SearchError::Cancelled));
        }

        run.advance(SearchState::Scanning);
        let aggregator = self.scan_all(&query.paths, &pattern, limit, cancel);

        // Partial results of a cancelled query are never returned
        if cancel.is_cancelled() {
            return Err(run.fail(SearchError::Cancelled));
        }

        run.advance(SearchState::Aggregating);
        let output = aggregator.snapshot();

        run.advance(SearchState::Done);
        Ok(output)
    }

    /// Walks `paths` on the calling thread and feeds every eligible file to the
    /// pool through a bounded queue.
    fn scan_all(
        &self,
        paths: &[String],
        pattern: &CompiledPattern,
        limit: usize,
        cancel: &CancellationToken,
    ) -> ResultAggregator {
        let aggregator = ResultAggregator::new(limit);
        let walker = TreeWalker::from_config(&self.config, self.metrics.clone());
        let workers = self.config.thread_count.get();
        let (tx, rx) = bounded::<WorkItem>(workers * 2);

        self.pool.in_place_scope(|scope| {
            for _ in 0..workers {
                let rx = rx.clone();
                let aggregator = &aggregator;
                scope.spawn(move |_| self.drain(rx, aggregator, cancel));
            }
            drop(rx);

            for (ordinal, path) in walker.walk(paths).enumerate() {
                if cancel.is_cancelled() {
                    debug!("Walk cancelled after {} files", ordinal);
                    break;
                }
                if aggregator.is_saturated_before(ordinal) {
                    debug!("Result cap reached after {} files, stopping walk", ordinal);
                    break;
                }

                let item = WorkItem {
                    ordinal,
                    path,
                    pattern: pattern.clone(),
                };
                if tx.send(item).is_err() {
                    break;
                }
            }

            // Closing the queue lets the workers finish
            drop(tx);
        });

        aggregator
    }

    /// Worker loop: scans files until the queue is closed
    fn drain(
        &self,
        rx: Receiver<WorkItem>,
        aggregator: &ResultAggregator,
        cancel: &CancellationToken,
    ) {
        for item in rx.iter() {
            // Keep draining after cancellation so the walker never blocks on a full queue
            if cancel.is_cancelled() || aggregator.is_saturated_before(item.ordinal) {
                trace!("Skipping {}", item.path.display());
                continue;
            }

            let batch = self.scan_file(&item, aggregator.limit(), cancel);
            aggregator.add(item.ordinal, batch);
        }
    }

    /// Collects at most `limit` matches from one file.
    ///
    /// A file that fails mid-read contributes nothing, so a query never
    /// returns matches from a file it could not read completely.
    fn scan_file(&self, item: &WorkItem, limit: usize, cancel: &CancellationToken) -> Vec<Match> {
        let mut lines = match self.scanner.scan(&item.path, &item.pattern) {
            Ok(lines) => lines.with_cancellation(cancel.clone()),
            Err(e) => {
                debug!("Skipping unreadable file: {}", e);
                self.metrics.record_file_skipped();
                return Vec::new();
            }
        };

        let mut batch = Vec::new();
        while batch.len() < limit {
            match lines.next() {
                Some(Ok(m)) => batch.push(m),
                Some(Err(SearchError::Cancelled)) => return Vec::new(),
                Some(Err(e)) => {
                    debug!("Skipping unreadable file: {}", e);
                    self.metrics.record_file_skipped();
                    return Vec::new();
                }
                None => break,
            }
        }

        debug!(
            "Scanned {}: {} matches in {} lines",
            item.path.display(),
            batch.len(),
            lines.lines_read()
        );
        self.metrics.record_file_scanned(lines.bytes_read(), batch.len());
        batch
    }
}

/// Runs a single query on a throwaway engine built from `config`
pub fn search(config: &SearchConfig, query: &SearchQuery) -> SearchResult<SearchOutput> {
    SearchEngine::new(config.clone())?.search_uncancellable(query)
}
