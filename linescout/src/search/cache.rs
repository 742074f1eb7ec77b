use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::errors::{SearchError, SearchResult};
use crate::metrics::SearchMetrics;

/// A compiled regular expression.
///
/// Cloning is cheap and every clone shares the same compiled program, so one
/// instance can be handed to all workers of a query.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Arc<Regex>,
}

impl CompiledPattern {
    /// Compiles `pattern` without going through a cache
    pub fn new(pattern: &str) -> SearchResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| SearchError::invalid_pattern(e.to_string()))?;
        Ok(Self {
            regex: Arc::new(regex),
        })
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// True when both handles point at the same compiled program
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.regex, &other.regex)
    }
}

#[derive(Debug)]
struct CacheEntry {
    pattern: CompiledPattern,
    last_used: AtomicU64,
}

impl CacheEntry {
    fn touch(&self, tick: u64) {
        self.last_used.fetch_max(tick, Ordering::Relaxed);
    }
}

/// Memoizes compiled patterns by their exact source text.
///
/// The map is sharded; a miss compiles while holding the write guard of the
/// entry's shard, so concurrent requests for the same new pattern wait for the
/// first compile instead of repeating it. When the cache grows past its
/// capacity the least recently used entry is evicted.
#[derive(Debug)]
pub struct PatternCache {
    entries: DashMap<String, CacheEntry>,
    capacity: usize,
    clock: AtomicU64,
    metrics: SearchMetrics,
}

impl PatternCache {
    pub fn new(capacity: usize) -> Self {
        Self::with_metrics(capacity, SearchMetrics::new())
    }

    pub fn with_metrics(capacity: usize, metrics: SearchMetrics) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
            metrics,
        }
    }

    /// Returns the compiled form of `pattern`, compiling it on first use.
    ///
    /// Invalid patterns are reported as [`SearchError::InvalidPattern`] and are
    /// not cached.
    pub fn compile(&self, pattern: &str) -> SearchResult<CompiledPattern> {
        let tick = self.clock.fetch_add(1, Ordering::Relaxed);

        if let Some(entry) = self.entries.get(pattern) {
            entry.touch(tick);
            self.metrics.record_cache_lookup(true);
            trace!("Pattern cache hit: {}", pattern);
            return Ok(entry.pattern.clone());
        }

        let compiled = match self.entries.entry(pattern.to_string()) {
            Entry::Occupied(entry) => {
                // Another caller compiled it while we waited for the guard
                entry.get().touch(tick);
                self.metrics.record_cache_lookup(true);
                entry.get().pattern.clone()
            }
            Entry::Vacant(slot) => {
                debug!("Compiling regex pattern: {}", pattern);
                let compiled = CompiledPattern::new(pattern)?;
                self.metrics.record_cache_lookup(false);
                slot.insert(CacheEntry {
                    pattern: compiled.clone(),
                    last_used: AtomicU64::new(tick),
                });
                compiled
            }
        };

        self.evict_overflow(pattern);
        Ok(compiled)
    }

    /// Drops least recently used entries until the cache fits its capacity.
    /// Must not be called while holding a guard into `entries`.
    fn evict_overflow(&self, keep: &str) {
        while self.entries.len() > self.capacity {
            let victim = self
                .entries
                .iter()
                .filter(|e| e.key() != keep)
                .min_by_key(|e| e.value().last_used.load(Ordering::Relaxed))
                .map(|e| e.key().clone());

            match victim {
                Some(key) => {
                    if self.entries.remove(&key).is_some() {
                        debug!("Evicted pattern from cache: {}", key);
                        self.metrics.record_cache_eviction();
                    }
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.entries.contains_key(pattern)
    }

    pub fn metrics(&self) -> &SearchMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_pattern_caching() {
        let cache = PatternCache::new(16);

        let first = cache.compile(r"^func\s+\w+").unwrap();
        assert_eq!(cache.metrics().cache_misses(), 1);
        assert_eq!(cache.metrics().cache_hits(), 0);

        let second = cache.compile(r"^func\s+\w+").unwrap();
        assert_eq!(cache.metrics().cache_misses(), 1);
        assert_eq!(cache.metrics().cache_hits(), 1);
        assert!(first.ptr_eq(&second), "cache hit should reuse the compiled regex");

        let _third = cache.compile(r"^type\s+").unwrap();
        assert_eq!(cache.metrics().cache_misses(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_invalid_pattern_not_cached() {
        let cache = PatternCache::new(16);

        let err = cache.compile("func(").unwrap_err();
        assert!(matches!(err, SearchError::InvalidPattern(_)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction() {
        let cache = PatternCache::new(2);

        cache.compile("alpha").unwrap();
        cache.compile("beta").unwrap();
        // Touch alpha so beta becomes the oldest entry
        cache.compile("alpha").unwrap();
        cache.compile("gamma").unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains("alpha"));
        assert!(cache.contains("gamma"));
        assert!(!cache.contains("beta"));
        assert_eq!(cache.metrics().get_stats().cache_evictions, 1);
    }

    #[test]
    fn test_concurrent_compile_single_miss() {
        let cache = Arc::new(PatternCache::new(16));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.compile(r"(?i)todo|fixme").unwrap())
            })
            .collect();

        let compiled: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(cache.metrics().cache_misses(), 1);
        assert_eq!(cache.metrics().cache_hits(), 7);
        assert!(compiled.windows(2).all(|w| w[0].ptr_eq(&w[1])));
    }
}
