//! Stdio tool server
//!
//! Speaks line-delimited JSON-RPC 2.0 and exposes the engine as a single
//! `search` tool.

pub mod error;
pub mod protocol;
pub mod server;
pub mod tools;

pub use error::McpError;
pub use server::McpServer;
pub use tools::SearchTool;
