//! Error types for the search engine.
//!
//! Only three variants ever escape a query: [`SearchError::InvalidPattern`],
//! [`SearchError::InvalidQuery`] and [`SearchError::Cancelled`]. The per-file and
//! per-path variants are produced inside the engine, logged, and absorbed so a
//! single bad file never changes the shape of a successful response.
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Search cancelled")]
    Cancelled,
    #[error("Unreadable file {path}: {reason}")]
    FileUnreadable { path: PathBuf, reason: String },
    #[error("Walk error: {0}")]
    Walk(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SearchError {
    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }

    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    pub fn file_unreadable(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        Self::FileUnreadable {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn walk(msg: impl Into<String>) -> Self {
        Self::Walk(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// True for errors caused by the caller's input rather than by the engine.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidPattern(_) | Self::InvalidQuery(_))
    }
}

impl From<config::ConfigError> for SearchError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}
