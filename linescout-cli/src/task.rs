use linescout::{SearchEngine, SearchError, SearchOutput, SearchQuery};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("search worker failed: {0}")]
    Worker(String),
}

/// Runs a query on the blocking thread pool, bounded by `timeout`.
///
/// The query is cancelled when the timeout fires or when the returned future
/// is dropped (for example because the client went away), so the engine
/// stops scanning and releases its file handles.
pub async fn run_search(
    engine: Arc<SearchEngine>,
    query: SearchQuery,
    timeout: Duration,
) -> Result<SearchOutput, TaskError> {
    let token = CancellationToken::new();
    let _cancel_on_drop = token.clone().drop_guard();

    let task_token = token.clone();
    let handle = tokio::task::spawn_blocking(move || engine.search(&query, &task_token));

    match tokio::time::timeout(timeout, handle).await {
        Ok(joined) => Ok(joined.map_err(|e| TaskError::Worker(e.to_string()))??),
        Err(_) => {
            warn!("Search timed out after {}", humantime::format_duration(timeout));
            token.cancel();
            Err(SearchError::Cancelled.into())
        }
    }
}
