//! Tool-calling agent loop
//!
//! Drives a chat model against a set of tools until it answers without
//! requesting another call. MCP servers and the SQL toolkit both plug in as
//! [`ToolProvider`]s.

use crate::llm::LLM;
use crate::types::{AppError, AppResult, ImageData, LLMMessage, LLMRequest, ToolDefinition};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Result of a single tool invocation
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub text: String,
    pub images: Vec<ImageData>,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait ToolProvider: Send + Sync {
    async fn list_tools(&self) -> AppResult<Vec<ToolDefinition>>;

    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> AppResult<ToolOutput>;
}

/// Final answer of an agent run plus any images the tools produced
#[derive(Debug, Clone, Default)]
pub struct AgentOutput {
    pub text: String,
    pub images: Vec<ImageData>,
}

pub struct ToolAgent {
    name: String,
    instructions: String,
    llm: LLM,
    max_turns: usize,
    temperature: Option<f32>,
}

impl ToolAgent {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>, llm: LLM, max_turns: usize) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            llm,
            max_turns,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run a single-input conversation to completion
    pub async fn run(&self, tools: &dyn ToolProvider, input: &str) -> AppResult<AgentOutput> {
        self.run_with_history(tools, vec![LLMMessage::user(input)]).await
    }

    pub async fn run_with_history(
        &self,
        tools: &dyn ToolProvider,
        mut messages: Vec<LLMMessage>,
    ) -> AppResult<AgentOutput> {
        let definitions = tools.list_tools().await?;
        info!(agent = %self.name, tools = definitions.len(), "Starting tool agent run");

        let mut images = Vec::new();

        for turn in 0..self.max_turns {
            let mut request = LLMRequest::new(self.llm.model(), messages.clone());
            request.system_instruction = Some(self.instructions.clone());
            request.tools = definitions.clone();
            request.temperature = self.temperature;

            let response = self.llm.create_chat_completion(&request).await?;

            if response.tool_calls.is_empty() {
                info!(agent = %self.name, turns = turn + 1, images = images.len(), "Tool agent finished");
                return Ok(AgentOutput {
                    text: response.content,
                    images,
                });
            }

            messages.push(LLMMessage::assistant_tool_calls(
                response.content,
                response.tool_calls.clone(),
            ));

            for call in response.tool_calls {
                debug!(agent = %self.name, tool = %call.name, "Calling tool");
                let output = match parse_arguments(&call.arguments) {
                    Ok(arguments) => tools.call_tool(&call.name, arguments).await,
                    Err(e) => Err(e),
                };

                let content = match output {
                    Ok(output) => {
                        images.extend(output.images);
                        if output.is_error {
                            format!("Error: {}", output.text)
                        } else {
                            output.text
                        }
                    }
                    // Tool failures go back to the model rather than aborting the run
                    Err(e) => {
                        warn!(agent = %self.name, tool = %call.name, error = %e, "Tool call failed");
                        format!("Error: {}", e)
                    }
                };
                messages.push(LLMMessage::tool(call.id, content));
            }
        }

        Err(AppError::Internal(format!(
            "agent '{}' did not produce a final answer within {} turns",
            self.name, self.max_turns
        )))
    }
}

fn parse_arguments(raw: &str) -> AppResult<serde_json::Value> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    serde_json::from_str(raw)
        .map_err(|e| AppError::InvalidRequest(format!("tool arguments are not valid JSON: {}", e)))
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::sync::Mutex;

    struct EchoTools {
        calls: Mutex<Vec<(String, serde_json::Value)>>,
    }

    #[async_trait]
    impl ToolProvider for EchoTools {
        async fn list_tools(&self) -> AppResult<Vec<ToolDefinition>> {
            Ok(vec![ToolDefinition {
                name: "echo".to_string(),
                description: "Echo the input".to_string(),
                parameters: serde_json::json!({"type": "object", "properties": {"a": {"type": "string"}}}),
            }])
        }

        async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> AppResult<ToolOutput> {
            self.calls.lock().unwrap().push((name.to_string(), arguments.clone()));
            if name != "echo" {
                return Err(AppError::Mcp(format!("unknown tool {}", name)));
            }
            Ok(ToolOutput {
                text: arguments["a"].as_str().unwrap_or_default().to_string(),
                images: vec![ImageData::new(vec![1u8, 2, 3], "image/png")],
                is_error: false,
            })
        }
    }

    fn tools() -> EchoTools {
        EchoTools { calls: Mutex::new(Vec::new()) }
    }

    #[tokio::test]
    async fn test_runs_tools_until_final_answer() {
        let llm = ScriptedLLM::new(vec![
            call("c1", "echo", r#"{"a":"AA1234 Departing at 9:30 AM"}"#),
            answer("Your flight is AA1234."),
        ]);
        let agent = ToolAgent::new("flights", "Use the tools.", LLM::new(llm.clone(), "m"), 5);
        let tools = tools();

        let output = agent.run(&tools, "Flights from Los Angeles?").await.unwrap();

        assert_eq!(output.text, "Your flight is AA1234.");
        assert_eq!(output.images.len(), 1);
        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].system_instruction.as_deref(), Some("Use the tools."));
        assert_eq!(requests[0].tools.len(), 1);
        let second = &requests[1].messages;
        assert_eq!(second.last().unwrap().role, "tool");
        assert_eq!(second.last().unwrap().content, "AA1234 Departing at 9:30 AM");
        assert_eq!(second.last().unwrap().tool_call_id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_tool_errors_are_reported_to_model() {
        let llm = ScriptedLLM::new(vec![
            call("c1", "missing", "{}"),
            call("c2", "echo", "not json"),
            answer("done"),
        ]);
        let agent = ToolAgent::new("a", "i", LLM::new(llm.clone(), "m"), 5);
        let tools = tools();

        let output = agent.run(&tools, "go").await.unwrap();
        assert_eq!(output.text, "done");

        let requests = llm.requests.lock().unwrap();
        assert!(requests[1].messages.last().unwrap().content.starts_with("Error:"));
        assert!(requests[2].messages.last().unwrap().content.contains("not valid JSON"));
        // the malformed arguments never reached the provider
        assert_eq!(tools.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_turn_limit_is_an_error() {
        let llm = ScriptedLLM::new(vec![call("c1", "echo", "{}"), call("c2", "echo", "{}")]);
        let agent = ToolAgent::new("looping", "i", LLM::new(llm, "m"), 2);
        let err = agent.run(&tools(), "go").await.unwrap_err();
        assert!(err.to_string().contains("2 turns"));
    }

    #[test]
    fn test_empty_arguments_become_empty_object() {
        assert_eq!(parse_arguments("  ").unwrap(), serde_json::json!({}));
    }
}
