//! Query and result types shared by the engine and every transport.
use serde::{Deserialize, Serialize};

use crate::errors::{SearchError, SearchResult};

/// One search request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Regular expression matched against every line
    pub pattern: String,
    /// Root paths, searched in order
    #[serde(default)]
    pub paths: Vec<String>,
    /// Result cap; zero means "use the configured default", negative is invalid
    #[serde(default)]
    pub max_results: i64,
}

impl SearchQuery {
    pub fn new(pattern: impl Into<String>, paths: Vec<String>, max_results: i64) -> Self {
        Self {
            pattern: pattern.into(),
            paths,
            max_results,
        }
    }

    /// Resolves the effective cap, rejecting negative values
    pub fn effective_limit(&self, default_max_results: usize) -> SearchResult<usize> {
        match self.max_results {
            n if n < 0 => Err(SearchError::invalid_query(format!(
                "max_results must not be negative (got {n})"
            ))),
            0 => Ok(default_max_results),
            n => usize::try_from(n)
                .map_err(|_| SearchError::invalid_query(format!("max_results too large: {n}"))),
        }
    }
}

/// A single matching line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Path of the file, as discovered by the walker
    pub file: String,
    /// 1-based line number
    pub line: usize,
    /// Line text with surrounding whitespace trimmed
    pub content: String,
}

/// The capped, ordered result of one query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutput {
    pub matches: Vec<Match>,
    /// Number of matches returned (post-cap)
    pub total: usize,
}

impl SearchOutput {
    pub fn from_matches(matches: Vec<Match>) -> Self {
        let total = matches.len();
        Self { matches, total }
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}
