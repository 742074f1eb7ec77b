use linescout::{SearchEngine, SearchError, SearchQuery};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::error::McpError;
use super::protocol::{ContentBlock, ToolResult, ToolSchema};
use crate::task::{run_search, TaskError};

pub const SEARCH_TOOL: &str = "search";

#[derive(Debug, Deserialize)]
struct SearchArgs {
    pattern: String,
    paths: Vec<String>,
    #[serde(default)]
    max_results: i64,
}

impl From<SearchArgs> for SearchQuery {
    fn from(args: SearchArgs) -> Self {
        SearchQuery::new(args.pattern, args.paths, args.max_results)
    }
}

/// The `search` tool: runs one query on the shared engine
#[derive(Debug, Clone)]
pub struct SearchTool {
    engine: Arc<SearchEngine>,
    timeout: Duration,
}

impl SearchTool {
    pub fn new(engine: Arc<SearchEngine>, timeout: Duration) -> Self {
        Self { engine, timeout }
    }

    pub fn name(&self) -> &str {
        SEARCH_TOOL
    }

    pub fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: SEARCH_TOOL.to_string(),
            description: "Search files under the given paths for lines matching a regular \
                          expression. Returns file, line number and trimmed line content for \
                          each match."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pattern": {
                        "type": "string",
                        "description": "Regular expression matched against each line"
                    },
                    "paths": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Files or directories to search, in order"
                    },
                    "max_results": {
                        "type": "integer",
                        "minimum": 0,
                        "description": format!(
                            "Maximum number of matches (default: {})",
                            self.engine.config().default_max_results
                        )
                    }
                },
                "required": ["pattern", "paths"]
            }),
            output_schema: Some(json!({
                "type": "object",
                "properties": {
                    "matches": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "file": {"type": "string"},
                                "line": {"type": "integer"},
                                "content": {"type": "string"}
                            },
                            "required": ["file", "line", "content"]
                        }
                    },
                    "total": {"type": "integer"}
                },
                "required": ["matches", "total"]
            })),
        }
    }

    /// Executes the tool.
    ///
    /// Bad arguments are a protocol error. A rejected pattern or query, and a
    /// timed out search, are reported as a tool result with `isError` set.
    pub async fn call(&self, arguments: Value) -> Result<ToolResult, McpError> {
        let args: SearchArgs = serde_json::from_value(arguments)
            .map_err(|e| McpError::InvalidParams(format!("Invalid search arguments: {e}")))?;
        debug!("search tool: pattern={:?} paths={:?}", args.pattern, args.paths);

        match run_search(self.engine.clone(), args.into(), self.timeout).await {
            Ok(output) => Ok(ToolResult {
                content: vec![ContentBlock::Text {
                    text: serde_json::to_string_pretty(&output)?,
                }],
                structured_content: Some(serde_json::to_value(&output)?),
                is_error: false,
            }),
            Err(TaskError::Search(e)) if e.is_client_error() => Ok(ToolResult::error(e.to_string())),
            Err(TaskError::Search(SearchError::Cancelled)) => {
                Ok(ToolResult::error("Search timed out and was cancelled"))
            }
            Err(e) => Err(McpError::InternalError(e.to_string())),
        }
    }
}
