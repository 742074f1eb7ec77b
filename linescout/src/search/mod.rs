//! The search pipeline.
//!
//! A query flows through these stages:
//!
//! 1. [`PatternCache`] resolves the pattern to a shared [`CompiledPattern`]
//! 2. [`TreeWalker`] enumerates eligible files, in a stable order, on the
//!    calling thread
//! 3. A fixed pool of workers pulls files from a bounded queue and streams
//!    their matching lines through the [`FileScanner`]
//! 4. A per-query [`ResultAggregator`] merges the batches by traversal order
//!    and applies the result cap
//!
//! [`SearchEngine`] owns the pool and the cache and drives the stages.
pub mod aggregator;
pub mod cache;
pub mod engine;
pub mod matcher;
pub mod scanner;
pub mod walker;

pub use aggregator::ResultAggregator;
pub use cache::{CompiledPattern, PatternCache};
pub use engine::{search, SearchEngine, SearchState};
pub use scanner::{FileScanner, LineMatches};
pub use walker::TreeWalker;
