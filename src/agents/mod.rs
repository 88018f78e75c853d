//! Agent System
//!
//! Every endpoint other than the raw chat proxy is backed by one of these:
//!
//! - **MCP agents**: airline baggage policy (filesystem server) and flight
//!   info (custom server), see [`mcp_agents`]
//! - **SQL copilot**: natural language to one validated SQL statement
//! - **SQL toolkit**: tool-calling agent that explores the database
//! - **Web surfer**: browser agent and assistant in a round-robin team, with
//!   a selector picking the final answer
//!
//! The MCP agents, the SQL toolkit and the web surfer all run on
//! [`tool_agent::ToolAgent`].

pub mod mcp_agents;
pub mod sql_copilot;
pub mod sql_toolkit;
pub mod tool_agent;
pub mod web_surfer;

pub use mcp_agents::{run_mcp_agent, McpAgentKind};
pub use sql_copilot::run_sql_query_copilot;
pub use sql_toolkit::run_sql_query;
pub use web_surfer::run_web_surfer;
