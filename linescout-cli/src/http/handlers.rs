use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use linescout::{SearchOutput, SearchQuery};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ApiError;
use super::AppState;
use crate::task::run_search;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Static liveness check, independent of the engine
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Runs one query.
///
/// # Errors
///
/// - 400 when the body does not decode, the pattern does not compile or
///   `max_results` is negative
/// - 504 when the query exceeds the request timeout
/// - 500 on any other internal failure
pub async fn search_handler(
    State(state): State<AppState>,
    payload: Result<Json<SearchQuery>, JsonRejection>,
) -> Result<Json<SearchOutput>, ApiError> {
    let Json(query) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    debug!("POST /search pattern={:?} paths={:?}", query.pattern, query.paths);

    let output = run_search(state.engine.clone(), query, state.request_timeout).await?;
    Ok(Json(output))
}
