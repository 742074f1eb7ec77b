use linescout::SearchEngine;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, error, info, warn};

use super::error::McpError;
use super::protocol::*;
use super::tools::SearchTool;

/// JSON-RPC tool server over a pair of byte streams.
///
/// Each request is one line of JSON; each response is written as one line.
/// Notifications are processed but never answered.
#[derive(Debug)]
pub struct McpServer {
    tool: SearchTool,
    initialized: AtomicBool,
}

impl McpServer {
    pub fn new(engine: Arc<SearchEngine>, request_timeout: Duration) -> Self {
        Self {
            tool: SearchTool::new(engine, request_timeout),
            initialized: AtomicBool::new(false),
        }
    }

    /// True once the client sent the `initialized` notification
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Serves stdin/stdout until EOF or Ctrl+C
    pub async fn run(&self) -> Result<(), McpError> {
        info!("Starting linescout MCP server");

        tokio::select! {
            result = self.serve(tokio::io::stdin(), tokio::io::stdout()) => result?,
            _ = tokio::signal::ctrl_c() => info!("Received shutdown signal"),
        }

        info!("MCP server shutting down");
        Ok(())
    }

    /// Reads requests from `input` and writes responses to `output` until
    /// `input` reaches EOF
    pub async fn serve<R, W>(&self, input: R, output: W) -> Result<(), McpError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(input).lines();
        let mut output = BufWriter::new(output);

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_line(&line).await {
                let json = serde_json::to_string(&response)?;
                debug!("Sending: {}", json);
                output.write_all(json.as_bytes()).await?;
                output.write_all(b"\n").await?;
                output.flush().await?;
            }
        }

        debug!("Input closed");
        Ok(())
    }

    /// Handles one raw message; `None` means nothing is sent back
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        debug!("Received: {}", line);

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                let err = McpError::ParseError(e.to_string());
                return Some(JsonRpcResponse::failure(None, err.code(), err.to_string()));
            }
        };

        let id = value.get("id").cloned();
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                let err = McpError::InvalidRequest(e.to_string());
                return Some(JsonRpcResponse::failure(id, err.code(), err.to_string()));
            }
        };

        let is_notification = request.is_notification();
        let id = request.id.clone();
        let result = self.dispatch(request).await;

        if is_notification {
            if let Err(e) = result {
                warn!("Notification failed: {}", e);
            }
            return None;
        }

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => {
                if e.code() == INTERNAL_ERROR {
                    error!("Error processing message: {}", e);
                }
                JsonRpcResponse::failure(id, e.code(), e.to_string())
            }
        })
    }

    async fn dispatch(&self, request: JsonRpcRequest) -> Result<Value, McpError> {
        if request.jsonrpc != JSONRPC_VERSION {
            return Err(McpError::InvalidRequest(format!(
                "unsupported jsonrpc version {:?}",
                request.jsonrpc
            )));
        }

        match request.method.as_str() {
            "initialize" => self.initialize(),
            "initialized" | "notifications/initialized" => {
                self.initialized.store(true, Ordering::SeqCst);
                info!("Client initialized");
                Ok(Value::Null)
            }
            "tools/list" => Ok(json!({ "tools": [self.tool.schema()] })),
            "tools/call" => self.call_tool(request.params).await,
            "ping" => Ok(json!({})),
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    fn initialize(&self) -> Result<Value, McpError> {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        Ok(serde_json::to_value(result)?)
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params = params.ok_or_else(|| McpError::InvalidParams("Missing params".to_string()))?;
        let params: ToolCallParams = serde_json::from_value(params)
            .map_err(|e| McpError::InvalidParams(e.to_string()))?;

        if params.name != self.tool.name() {
            return Err(McpError::InvalidParams(format!(
                "Tool not found: {}",
                params.name
            )));
        }

        let result = self.tool.call(params.arguments).await?;
        Ok(serde_json::to_value(result)?)
    }
}
