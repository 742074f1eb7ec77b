use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

use crate::results::{Match, SearchOutput};

#[derive(Debug, Default)]
struct AggregatorState {
    /// Matches of finished files, keyed by the file's traversal ordinal
    batches: BTreeMap<usize, Vec<Match>>,
    /// Lowest ordinal that can no longer contribute, once the finished
    /// batches before it hold the whole cap. Only ever decreases.
    cutoff: Option<usize>,
}

impl AggregatorState {
    fn excluded(&self, ordinal: usize) -> bool {
        self.cutoff.is_some_and(|cutoff| ordinal >= cutoff)
    }

    /// Recomputes the cutoff and drops every batch at or past it
    fn prune(&mut self, limit: usize) {
        let mut held = 0;
        let cutoff = self.batches.iter().find_map(|(&ordinal, batch)| {
            held += batch.len();
            (held >= limit).then_some(ordinal + 1)
        });

        if let Some(cutoff) = cutoff {
            self.cutoff = Some(cutoff);
            drop(self.batches.split_off(&cutoff));
        }
    }
}

/// Collects the matches of one query from all scanner workers.
///
/// One instance exists per query and is passed to the workers by reference.
/// All state sits behind a single mutex and no I/O ever happens while the
/// lock is held.
///
/// Results are ordered by file ordinal (traversal order) and then by line, and
/// capped at `limit`, so the output is always a prefix of the full match
/// sequence regardless of which worker finished first. Files still being
/// scanned never delay the cutoff: as soon as finished files before ordinal
/// `k` hold `limit` matches, nothing at or after `k` is kept, so the
/// aggregator holds fewer than `2 * limit` matches at any time.
#[derive(Debug)]
pub struct ResultAggregator {
    limit: usize,
    state: Mutex<AggregatorState>,
}

impl ResultAggregator {
    pub fn new(limit: usize) -> Self {
        let state = AggregatorState {
            cutoff: (limit == 0).then_some(0),
            ..AggregatorState::default()
        };
        Self {
            limit,
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AggregatorState> {
        // The state stays consistent even if a worker panicked mid-query
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Records the matches of the finished file `ordinal`.
    ///
    /// Files that were skipped or unreadable are reported with an empty batch.
    /// Batches from files past the cutoff are dropped.
    pub fn add(&self, ordinal: usize, batch: Vec<Match>) {
        if batch.is_empty() {
            return;
        }

        let mut state = self.lock();
        if state.excluded(ordinal) {
            trace!("Dropping {} matches for file #{}", batch.len(), ordinal);
            return;
        }

        trace!("Aggregating {} matches for file #{}", batch.len(), ordinal);
        state.batches.insert(ordinal, batch);
        state.prune(self.limit);
    }

    /// True when file `ordinal` can no longer contribute to the result because
    /// finished files before it already fill the cap. Once true for some
    /// ordinal it stays true for it and for every later one.
    pub fn is_saturated_before(&self, ordinal: usize) -> bool {
        self.lock().excluded(ordinal)
    }

    /// Produces the ordered, capped result set
    pub fn snapshot(&self) -> SearchOutput {
        let state = self.lock();
        let matches: Vec<Match> = state
            .batches
            .values()
            .flatten()
            .take(self.limit)
            .cloned()
            .collect();
        SearchOutput::from_matches(matches)
    }
}
