//! Protocol tests for the stdio tool server, run over in-memory streams

use linescout::{SearchConfig, SearchEngine};
use linescout_cli::McpServer;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

fn create_server() -> McpServer {
    let engine = Arc::new(SearchEngine::new(SearchConfig::default()).unwrap());
    McpServer::new(engine, Duration::from_secs(30))
}

fn create_test_files() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), "func Foo\nbar\n").unwrap();
    std::fs::write(dir.path().join("b.txt"), "func Bar\nbaz\n").unwrap();
    dir
}

/// Feeds `requests` to the server, one per line, and returns every response
async fn exchange(server: &McpServer, requests: &[Value]) -> Vec<Value> {
    let input: String = requests.iter().map(|r| format!("{r}\n")).collect();
    let mut output = Vec::new();

    server.serve(input.as_bytes(), &mut output).await.unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn initialize() -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {"name": "test-client", "version": "1.0.0"}
        }
    })
}

#[tokio::test]
async fn test_handshake_and_tool_listing() {
    let server = create_server();
    let responses = exchange(
        &server,
        &[
            initialize(),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        ],
    )
    .await;

    // The notification is not answered
    assert_eq!(responses.len(), 2);
    assert!(server.is_initialized());

    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "linescout");

    let tools = responses[1]["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "search");
    assert_eq!(tools[0]["inputSchema"]["required"], json!(["pattern", "paths"]));
}

#[tokio::test]
async fn test_search_tool_call() {
    let dir = create_test_files();
    let server = create_server();

    let responses = exchange(
        &server,
        &[
            initialize(),
            json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": {
                    "name": "search",
                    "arguments": {
                        "pattern": "^func",
                        "paths": [dir.path().to_str().unwrap()],
                        "max_results": 10
                    }
                }
            }),
        ],
    )
    .await;

    let result = &responses[1]["result"];
    assert_eq!(responses[1]["id"], 3);
    assert_eq!(result["structuredContent"]["total"], 2);
    assert_eq!(result["structuredContent"]["matches"][0]["content"], "func Foo");
    assert_eq!(result["structuredContent"]["matches"][1]["content"], "func Bar");

    // The text block is the same result, pretty-printed
    assert_eq!(result["content"][0]["type"], "text");
    let text: Value = serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(text, result["structuredContent"]);
}

#[tokio::test]
async fn test_search_tool_reports_invalid_pattern() {
    let server = create_server();
    let responses = exchange(
        &server,
        &[json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {"name": "search", "arguments": {"pattern": "(", "paths": []}}
        })],
    )
    .await;

    assert_eq!(responses[0]["result"]["isError"], true);
    assert!(responses[0].get("error").is_none());
}

#[tokio::test]
async fn test_protocol_errors() {
    let server = create_server();
    let mut output = Vec::new();
    let input = "not json\n\n{\"jsonrpc\":\"2.0\",\"id\":5,\"method\":\"nope\"}\n";

    server.serve(input.as_bytes(), &mut output).await.unwrap();

    let responses: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    // The blank line is skipped
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["error"]["code"], -32700);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[1]["error"]["code"], -32601);
    assert_eq!(responses[1]["id"], 5);
}

#[tokio::test]
async fn test_interleaved_requests_over_duplex() {
    let server = Arc::new(create_server());
    let (client, server_end) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_end);
    let (client_read, mut client_write) = tokio::io::split(client);

    let task = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.serve(server_read, server_write).await })
    };

    let mut responses = BufReader::new(client_read).lines();

    client_write
        .write_all(format!("{}\n", json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})).as_bytes())
        .await
        .unwrap();
    let pong: Value = serde_json::from_str(&responses.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(pong["id"], 1);
    assert_eq!(pong["result"], json!({}));

    client_write.write_all(format!("{}\n", initialize()).as_bytes()).await.unwrap();
    let init: Value = serde_json::from_str(&responses.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(init["id"], 1);
    assert!(init["result"]["capabilities"]["tools"].is_object());

    // EOF ends the serve loop
    client_write.shutdown().await.unwrap();
    drop(client_write);
    task.await.unwrap().unwrap();
}
