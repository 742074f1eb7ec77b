//! End-to-end tests for the HTTP API

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use linescout::{SearchConfig, SearchEngine, SearchOutput};
use linescout_cli::http::{router, AppState, HealthResponse};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt as TowerServiceExt;

fn create_test_app() -> Router {
    let engine = Arc::new(SearchEngine::new(SearchConfig::default()).unwrap());
    router(AppState::new(engine, Duration::from_secs(30)))
}

fn create_test_files() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), "func Foo\nbar\n").unwrap();
    std::fs::write(dir.path().join("b.txt"), "func Bar\nbaz\n").unwrap();
    dir
}

async fn post_search(app: Router, body: String) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/search")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1_000_000)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = create_test_app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 10_000)
        .await
        .unwrap();
    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn test_search_returns_matches_and_total() {
    let dir = create_test_files();
    let req = json!({
        "pattern": "^func",
        "paths": [dir.path().to_str().unwrap()],
        "max_results": 10
    });

    let (status, body) = post_search(create_test_app(), req.to_string()).await;
    assert_eq!(status, StatusCode::OK);

    let output: SearchOutput = serde_json::from_value(body).unwrap();
    assert_eq!(output.total, 2);
    assert_eq!(output.matches[0].content, "func Foo");
    assert_eq!(output.matches[0].line, 1);
    assert!(output.matches[0].file.ends_with("a.txt"));
    assert_eq!(output.matches[1].content, "func Bar");
}

#[tokio::test]
async fn test_search_respects_cap() {
    let dir = create_test_files();
    let req = json!({
        "pattern": "^func",
        "paths": [dir.path().to_str().unwrap()],
        "max_results": 1
    });

    let (status, body) = post_search(create_test_app(), req.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["matches"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_max_results_uses_default() {
    let dir = create_test_files();
    let req = json!({
        "pattern": "a",
        "paths": [dir.path().to_str().unwrap()]
    });

    let (status, body) = post_search(create_test_app(), req.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn test_invalid_pattern_is_client_error() {
    let req = json!({"pattern": "func(", "paths": ["."], "max_results": 10});

    let (status, body) = post_search(create_test_app(), req.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("Invalid pattern"));
}

#[tokio::test]
async fn test_negative_cap_is_client_error() {
    let req = json!({"pattern": "x", "paths": ["."], "max_results": -5});

    let (status, _) = post_search(create_test_app(), req.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_body_is_client_error() {
    let (status, body) = post_search(create_test_app(), "{\"pattern\": ".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_empty_paths_return_empty_result() {
    let req = json!({"pattern": "x", "paths": []});

    let (status, body) = post_search(create_test_app(), req.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"matches": [], "total": 0}));
}
