use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use linescout::SearchError;
use serde_json::json;
use thiserror::Error;

use crate::task::TaskError;

/// Errors returned by the HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Search(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Search(SearchError::Cancelled) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Search(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::Search(e) => ApiError::Search(e),
            TaskError::Worker(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
