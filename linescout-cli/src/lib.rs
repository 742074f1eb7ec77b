//! Front ends for the linescout search engine: a one-shot command line
//! search, an HTTP API and a stdio JSON-RPC tool server.
pub mod http;
pub mod logging;
pub mod mcp;
pub mod task;

pub use http::{router, AppState, ServerConfig};
pub use mcp::McpServer;
pub use task::{run_search, TaskError};
