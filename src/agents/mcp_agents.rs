//! MCP-backed agents
//!
//! - **Airline info**: answers baggage-policy questions from text files served
//!   by the filesystem MCP server.
//! - **Flight info**: answers flight questions through the custom flight-info
//!   MCP server, which receives the user message as its last argument.

use crate::agents::tool_agent::ToolAgent;
use crate::config::McpConfig;
use crate::llm::LLM;
use crate::mcp::McpToolServer;
use crate::types::AppResult;
use tracing::info;

const AIRLINE_INSTRUCTIONS: &str =
    "Use the tools to return airline baggage policy info from the text files in the data directory.";
const FLIGHT_INFO_INSTRUCTIONS: &str = "Use the tools based on the user prompt.";

/// Which MCP-backed agent to run
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum McpAgentKind {
    AirlineInfo,
    FlightInfo,
}

impl McpAgentKind {
    fn server_name(self) -> &'static str {
        match self {
            McpAgentKind::AirlineInfo => "Filesystem Server, via npx",
            McpAgentKind::FlightInfo => "Flight Info Bot",
        }
    }

    fn instructions(self) -> &'static str {
        match self {
            McpAgentKind::AirlineInfo => AIRLINE_INSTRUCTIONS,
            McpAgentKind::FlightInfo => FLIGHT_INFO_INSTRUCTIONS,
        }
    }

    /// Command line and extra arguments for the server of this agent
    fn server_command(self, config: &McpConfig, message: &str) -> (String, Vec<String>) {
        match self {
            McpAgentKind::AirlineInfo => (
                config.filesystem_command.clone(),
                vec![config.filesystem_data_dir.clone()],
            ),
            McpAgentKind::FlightInfo => (config.flight_info_command.clone(), vec![message.to_string()]),
        }
    }
}

/// Spawn the agent's MCP server, answer `message`, and stop the server
pub async fn run_mcp_agent(
    kind: McpAgentKind,
    llm: LLM,
    config: &McpConfig,
    message: &str,
) -> AppResult<String> {
    info!(agent = ?kind, message_len = message.len(), "Running MCP agent");

    let (command, extra_args) = kind.server_command(config, message);
    let server = McpToolServer::spawn(kind.server_name(), &command, &extra_args).await?;

    let agent = ToolAgent::new("Assistant", kind.instructions(), llm, config.max_turns);
    let result = agent.run(&server, message).await;
    server.shutdown().await;

    let output = result?;
    info!(agent = ?kind, response_len = output.text.len(), "MCP agent finished");
    Ok(output.text)
}
