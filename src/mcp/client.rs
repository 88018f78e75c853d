use crate::agents::tool_agent::{ToolOutput, ToolProvider};
use crate::types::{AppError, AppResult, ImageData, ToolDefinition};
use crate::utils::command::{find_executable, split_command_line};
use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParam, CallToolResult},
    service::RunningService,
    transport::{ConfigureCommandExt, TokioChildProcess},
    RoleClient, ServiceExt,
};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// A stdio MCP server spawned as a child process
pub struct McpToolServer {
    name: String,
    client: RunningService<RoleClient, ()>,
    tools: OnceCell<Vec<ToolDefinition>>,
}

impl McpToolServer {
    /// Spawn `command_line` (program plus arguments) with `extra_args` appended
    pub async fn spawn(name: &str, command_line: &str, extra_args: &[String]) -> AppResult<Self> {
        let (program, mut args) = split_command_line(command_line)
            .ok_or_else(|| AppError::Mcp(format!("empty command for MCP server '{}'", name)))?;
        args.extend(extra_args.iter().cloned());

        if find_executable(&program).is_none() {
            return Err(AppError::Mcp(format!(
                "{} is not installed or not found in PATH",
                program
            )));
        }

        info!(server = %name, program = %program, args = ?args, "Starting MCP server");

        let transport = TokioChildProcess::new(Command::new(&program).configure(|cmd| {
            cmd.args(&args);
        }))
        .map_err(|e| AppError::Mcp(format!("failed to spawn '{}': {}", program, e)))?;

        let client = ()
            .serve(transport)
            .await
            .map_err(|e| AppError::Mcp(format!("failed to connect to '{}': {}", name, e)))?;

        Ok(Self {
            name: name.to_string(),
            client,
            tools: OnceCell::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the child process
    pub async fn shutdown(self) {
        if let Err(e) = self.client.cancel().await {
            warn!(server = %self.name, error = %e, "MCP server did not shut down cleanly");
        }
    }
}

/// Flatten MCP result content into text and decoded images
fn convert_result(result: CallToolResult) -> ToolOutput {
    let mut texts = Vec::new();
    let mut images = Vec::new();

    for content in &result.content {
        if let Some(text) = content.as_text() {
            texts.push(text.text.clone());
        } else if let Some(image) = content.as_image() {
            match ImageData::from_base64(&image.data, image.mime_type.clone()) {
                Ok(decoded) => images.push(decoded),
                Err(e) => warn!(error = %e, "Dropping undecodable image from tool result"),
            }
        }
    }

    ToolOutput {
        text: texts.join("\n"),
        images,
        is_error: result.is_error.unwrap_or(false),
    }
}

#[async_trait]
impl ToolProvider for McpToolServer {
    async fn list_tools(&self) -> AppResult<Vec<ToolDefinition>> {
        let tools = self
            .tools
            .get_or_try_init(|| async {
                let listed = self
                    .client
                    .list_tools(Default::default())
                    .await
                    .map_err(|e| AppError::Mcp(format!("failed to list tools of '{}': {}", self.name, e)))?;

                info!(server = %self.name, count = listed.tools.len(), "Discovered MCP tools");

                Ok::<_, AppError>(
                    listed
                        .tools
                        .into_iter()
                        .map(|tool| ToolDefinition {
                            name: tool.name.to_string(),
                            description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
                            parameters: serde_json::Value::Object((*tool.input_schema).clone()),
                        })
                        .collect(),
                )
            })
            .await?;
        Ok(tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> AppResult<ToolOutput> {
        let result = self
            .client
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: arguments.as_object().cloned(),
            })
            .await
            .map_err(|e| AppError::Mcp(format!("tool '{}' failed: {}", name, e)))?;

        Ok(convert_result(result))
    }
}
