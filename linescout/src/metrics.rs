use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Counters describing the work done by an engine across all of its queries.
///
/// Cloning shares the underlying counters, so the pattern cache and the
/// scanner workers can each hold a handle.
#[derive(Debug, Clone)]
pub struct SearchMetrics {
    // Pattern cache
    cache_hits: Arc<AtomicU64>,
    cache_misses: Arc<AtomicU64>,
    cache_evictions: Arc<AtomicU64>,

    // Scanning
    files_scanned: Arc<AtomicU64>,
    files_skipped: Arc<AtomicU64>,
    bytes_read: Arc<AtomicU64>,
    matches_found: Arc<AtomicU64>,

    // Traversal
    walk_errors: Arc<AtomicU64>,

    // Queries
    queries_completed: Arc<AtomicU64>,
    queries_failed: Arc<AtomicU64>,
}

impl SearchMetrics {
    /// Creates a new SearchMetrics instance
    pub fn new() -> Self {
        Self {
            cache_hits: Arc::new(AtomicU64::new(0)),
            cache_misses: Arc::new(AtomicU64::new(0)),
            cache_evictions: Arc::new(AtomicU64::new(0)),
            files_scanned: Arc::new(AtomicU64::new(0)),
            files_skipped: Arc::new(AtomicU64::new(0)),
            bytes_read: Arc::new(AtomicU64::new(0)),
            matches_found: Arc::new(AtomicU64::new(0)),
            walk_errors: Arc::new(AtomicU64::new(0)),
            queries_completed: Arc::new(AtomicU64::new(0)),
            queries_failed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a pattern cache lookup
    pub fn record_cache_lookup(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_cache_eviction(&self) {
        self.cache_evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a fully scanned file
    pub fn record_file_scanned(&self, bytes: u64, matches: usize) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
        self.matches_found
            .fetch_add(matches as u64, Ordering::Relaxed);
        debug!("Scanned {} bytes, {} matches", bytes, matches);
    }

    /// Records a file that could not be read and was skipped
    pub fn record_file_skipped(&self) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_walk_error(&self) {
        self.walk_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_query(&self, succeeded: bool) {
        if succeeded {
            self.queries_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.queries_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Gets a point-in-time copy of every counter
    pub fn get_stats(&self) -> SearchStats {
        SearchStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_evictions: self.cache_evictions.load(Ordering::Relaxed),
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            matches_found: self.matches_found.load(Ordering::Relaxed),
            walk_errors: self.walk_errors.load(Ordering::Relaxed),
            queries_completed: self.queries_completed.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
        }
    }

    /// Logs current statistics
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            cache_hits = stats.cache_hits,
            cache_misses = stats.cache_misses,
            cache_evictions = stats.cache_evictions,
            files_scanned = stats.files_scanned,
            files_skipped = stats.files_skipped,
            bytes_read = stats.bytes_read,
            matches_found = stats.matches_found,
            walk_errors = stats.walk_errors,
            queries_completed = stats.queries_completed,
            queries_failed = stats.queries_failed,
            "Engine stats"
        );
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of [`SearchMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_evictions: u64,
    pub files_scanned: u64,
    pub files_skipped: u64,
    pub bytes_read: u64,
    pub matches_found: u64,
    pub walk_errors: u64,
    pub queries_completed: u64,
    pub queries_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_metrics() {
        let metrics = SearchMetrics::new();

        metrics.record_cache_lookup(false);
        metrics.record_cache_lookup(true);
        metrics.record_cache_lookup(true);
        metrics.record_cache_eviction();

        let stats = metrics.get_stats();
        assert_eq!(stats.cache_hits, 2);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cache_evictions, 1);
    }

    #[test]
    fn test_file_tracking() {
        let metrics = SearchMetrics::new();

        metrics.record_file_scanned(1000, 3);
        metrics.record_file_scanned(500, 0);
        metrics.record_file_skipped();
        metrics.record_walk_error();

        let stats = metrics.get_stats();
        assert_eq!(stats.files_scanned, 2);
        assert_eq!(stats.bytes_read, 1500);
        assert_eq!(stats.matches_found, 3);
        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.walk_errors, 1);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = SearchMetrics::new();
        let handle = metrics.clone();

        handle.record_query(true);
        handle.record_query(false);

        let stats = metrics.get_stats();
        assert_eq!(stats.queries_completed, 1);
        assert_eq!(stats.queries_failed, 1);
    }
}
