//! Model Context Protocol client side
//!
//! MCP servers are spawned over stdio with `rmcp` and exposed to agents as
//! [`crate::agents::tool_agent::ToolProvider`]s.

pub mod client;

pub use client::McpToolServer;
