//! Messages emitted by a team run and their classification

use crate::types::ImageData;

#[derive(Debug, Clone, PartialEq)]
pub enum MessagePart {
    Text(String),
    Image(ImageData),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Text(String),
    MultiModal(Vec<MessagePart>),
}

/// One conversational turn inside a team run
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub source: String,
    pub content: Option<MessageBody>,
}

impl ChatMessage {
    pub fn text(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: Some(MessageBody::Text(text.into())),
        }
    }

    pub fn multimodal(source: impl Into<String>, parts: Vec<MessagePart>) -> Self {
        Self {
            source: source.into(),
            content: Some(MessageBody::MultiModal(parts)),
        }
    }

    /// Text of the message with image parts left out
    pub fn text_content(&self) -> String {
        match &self.content {
            None => String::new(),
            Some(MessageBody::Text(text)) => text.clone(),
            Some(MessageBody::MultiModal(parts)) => parts
                .iter()
                .filter_map(|part| match part {
                    MessagePart::Text(text) => Some(text.as_str()),
                    MessagePart::Image(_) => None,
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Items produced by [`super::team::AgentTeam::run_stream`]
#[derive(Debug, Clone, PartialEq)]
pub enum TeamMessage {
    Chat(ChatMessage),
    /// Final item of a run
    TaskResult { stop_reason: String, message_count: usize },
}

/// Classified stream item, as consumed by the collector
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Text(String),
    MultiModal(Vec<MessagePart>),
    Other,
}

impl From<TeamMessage> for StreamEvent {
    fn from(message: TeamMessage) -> Self {
        match message {
            TeamMessage::Chat(ChatMessage { content: Some(MessageBody::Text(text)), .. }) => StreamEvent::Text(text),
            TeamMessage::Chat(ChatMessage { content: Some(MessageBody::MultiModal(parts)), .. }) => {
                StreamEvent::MultiModal(parts)
            }
            TeamMessage::Chat(ChatMessage { content: None, .. }) | TeamMessage::TaskResult { .. } => {
                StreamEvent::Other
            }
        }
    }
}
