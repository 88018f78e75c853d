//! The two members of the web-surfing team

use super::events::{ChatMessage, MessagePart};
use super::team::TeamParticipant;
use crate::agents::tool_agent::{ToolAgent, ToolProvider};
use crate::llm::LLM;
use crate::types::{AppResult, LLMMessage, LLMRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub const WEB_SURFER_NAME: &str = "web_surfer";
pub const ASSISTANT_NAME: &str = "assistant";

const ASSISTANT_SYSTEM_MESSAGE: &str = "You are a helpful assistant that can provide information to the user based on web searches conducted by the Web Surfer agent.";

const WEB_SURFER_INSTRUCTIONS: &str = "You are a web surfer operating a headless browser through the available tools. \
Navigate to the pages needed to answer the request, read their content, and take a screenshot of the most relevant page. \
Finish with a short description of what you found on the pages you visited.";

/// Chat history as seen by `speaker`: its own turns are assistant turns,
/// everyone else's are user turns. Image parts are not forwarded.
pub fn history_for(speaker: &str, history: &[ChatMessage]) -> Vec<LLMMessage> {
    history
        .iter()
        .filter_map(|message| {
            let text = message.text_content();
            if text.is_empty() {
                return None;
            }
            Some(if message.source == speaker {
                LLMMessage::assistant(text)
            } else {
                LLMMessage::user(text)
            })
        })
        .collect()
}

pub struct AssistantParticipant {
    llm: LLM,
}

impl AssistantParticipant {
    pub fn new(llm: LLM) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl TeamParticipant for AssistantParticipant {
    fn name(&self) -> &str {
        ASSISTANT_NAME
    }

    async fn respond(&self, history: &[ChatMessage]) -> AppResult<ChatMessage> {
        let mut request = LLMRequest::new(self.llm.model(), history_for(ASSISTANT_NAME, history));
        request.system_instruction = Some(ASSISTANT_SYSTEM_MESSAGE.to_string());

        let response = self.llm.create_chat_completion(&request).await?;
        Ok(ChatMessage::text(ASSISTANT_NAME, response.content))
    }
}

/// Browses through the browser MCP server and reports text plus screenshots
pub struct WebSurferParticipant {
    agent: ToolAgent,
    browser: Arc<dyn ToolProvider>,
}

impl WebSurferParticipant {
    pub fn new(llm: LLM, browser: Arc<dyn ToolProvider>, max_turns: usize) -> Self {
        Self {
            agent: ToolAgent::new(WEB_SURFER_NAME, WEB_SURFER_INSTRUCTIONS, llm, max_turns),
            browser,
        }
    }
}

#[async_trait]
impl TeamParticipant for WebSurferParticipant {
    fn name(&self) -> &str {
        WEB_SURFER_NAME
    }

    async fn respond(&self, history: &[ChatMessage]) -> AppResult<ChatMessage> {
        let output = self
            .agent
            .run_with_history(self.browser.as_ref(), history_for(WEB_SURFER_NAME, history))
            .await?;

        info!(text_len = output.text.len(), images = output.images.len(), "Web surfer turn finished");

        let mut parts = Vec::with_capacity(output.images.len() + 1);
        if !output.text.is_empty() {
            parts.push(MessagePart::Text(output.text));
        }
        parts.extend(output.images.into_iter().map(MessagePart::Image));

        Ok(ChatMessage::multimodal(WEB_SURFER_NAME, parts))
    }
}
