//! Tool-invocation transport (`threadkeep mcp`).

pub mod server;
pub mod types;

pub use server::McpServer;
