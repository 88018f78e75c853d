//! Round-robin group chat
//!
//! Participants speak in a fixed order, each seeing the full history, until
//! the termination condition fires. Every message (the task included) is
//! emitted on the stream as it is produced, followed by one
//! [`TeamMessage::TaskResult`].

use super::events::{ChatMessage, TeamMessage};
use crate::types::{AppError, AppResult};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use tracing::{debug, info};

pub const TASK_SOURCE: &str = "user";

#[async_trait]
pub trait TeamParticipant: Send + Sync {
    fn name(&self) -> &str;

    async fn respond(&self, history: &[ChatMessage]) -> AppResult<ChatMessage>;
}

/// A multi-agent conversation that can be consumed as a stream
pub trait AgentTeam: Send + Sync {
    fn run_stream<'a>(&'a self, task: String) -> BoxStream<'a, AppResult<TeamMessage>>;
}

/// Stop on message count or on a keyword in the latest message
#[derive(Debug, Clone)]
pub struct TerminationCondition {
    pub max_messages: usize,
    pub keyword: String,
}

impl TerminationCondition {
    pub fn new(max_messages: usize, keyword: impl Into<String>) -> Self {
        Self {
            max_messages,
            keyword: keyword.into(),
        }
    }

    /// Stop reason, if the conversation should end after `history`
    pub fn check(&self, history: &[ChatMessage]) -> Option<String> {
        if history.len() >= self.max_messages {
            return Some(format!(
                "Maximum number of messages {} reached, current message count: {}",
                self.max_messages,
                history.len()
            ));
        }
        let latest = history.last()?;
        if !self.keyword.is_empty() && latest.text_content().contains(&self.keyword) {
            return Some(format!("Text '{}' mentioned", self.keyword));
        }
        None
    }
}

pub struct RoundRobinTeam {
    participants: Vec<Arc<dyn TeamParticipant>>,
    termination: TerminationCondition,
}

impl RoundRobinTeam {
    pub fn new(participants: Vec<Arc<dyn TeamParticipant>>, termination: TerminationCondition) -> Self {
        Self {
            participants,
            termination,
        }
    }
}

impl AgentTeam for RoundRobinTeam {
    fn run_stream<'a>(&'a self, task: String) -> BoxStream<'a, AppResult<TeamMessage>> {
        Box::pin(try_stream! {
            if self.participants.is_empty() {
                Err::<(), _>(AppError::Internal("team has no participants".to_string()))?;
            }

            let task_message = ChatMessage::text(TASK_SOURCE, task);
            let mut history = vec![task_message.clone()];
            yield TeamMessage::Chat(task_message);

            let mut turn = 0;
            let stop_reason = loop {
                if let Some(reason) = self.termination.check(&history) {
                    break reason;
                }
                let speaker = &self.participants[turn % self.participants.len()];
                debug!(speaker = %speaker.name(), turn, "Team turn");

                let message = speaker.respond(&history).await?;
                history.push(message.clone());
                yield TeamMessage::Chat(message);
                turn += 1;
            };

            info!(messages = history.len(), stop_reason = %stop_reason, "Team run finished");
            yield TeamMessage::TaskResult {
                stop_reason,
                message_count: history.len(),
            };
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Parrot {
        name: &'static str,
        reply: &'static str,
        seen: AtomicUsize,
    }

    impl Parrot {
        fn new(name: &'static str, reply: &'static str) -> Arc<Self> {
            Arc::new(Self { name, reply, seen: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl TeamParticipant for Parrot {
        fn name(&self) -> &str {
            self.name
        }

        async fn respond(&self, history: &[ChatMessage]) -> AppResult<ChatMessage> {
            self.seen.store(history.len(), Ordering::SeqCst);
            Ok(ChatMessage::text(self.name, self.reply))
        }
    }

    struct Broken;

    #[async_trait]
    impl TeamParticipant for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn respond(&self, _history: &[ChatMessage]) -> AppResult<ChatMessage> {
            Err(AppError::Mcp("browser crashed".into()))
        }
    }

    async fn run(team: &RoundRobinTeam, task: &str) -> Vec<AppResult<TeamMessage>> {
        team.run_stream(task.to_string()).collect().await
    }

    fn sources(messages: &[AppResult<TeamMessage>]) -> Vec<String> {
        messages
            .iter()
            .filter_map(|m| match m {
                Ok(TeamMessage::Chat(chat)) => Some(chat.source.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_alternates_until_max_messages() {
        let surfer = Parrot::new("web_surfer", "page");
        let assistant = Parrot::new("assistant", "summary");
        let team = RoundRobinTeam::new(
            vec![
                surfer.clone() as Arc<dyn TeamParticipant>,
                assistant.clone() as Arc<dyn TeamParticipant>,
            ],
            TerminationCondition::new(6, "TERMINATE"),
        );

        let messages = run(&team, "weather?").await;

        assert_eq!(
            sources(&messages),
            vec!["user", "web_surfer", "assistant", "web_surfer", "assistant", "web_surfer"]
        );
        assert_eq!(surfer.seen.load(Ordering::SeqCst), 5);
        match messages.last() {
            Some(Ok(TeamMessage::TaskResult { message_count, stop_reason })) => {
                assert_eq!(*message_count, 6);
                assert!(stop_reason.contains("Maximum number of messages"));
            }
            other => panic!("expected task result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_keyword_stops_early() {
        let team = RoundRobinTeam::new(
            vec![
                Parrot::new("web_surfer", "page") as Arc<dyn TeamParticipant>,
                Parrot::new("assistant", "All done. TERMINATE") as Arc<dyn TeamParticipant>,
            ],
            TerminationCondition::new(6, "TERMINATE"),
        );

        let messages = run(&team, "weather?").await;
        assert_eq!(sources(&messages), vec!["user", "web_surfer", "assistant"]);
    }

    #[tokio::test]
    async fn test_participant_error_ends_stream_with_error() {
        let team = RoundRobinTeam::new(vec![Arc::new(Broken) as Arc<dyn TeamParticipant>], TerminationCondition::new(6, "TERMINATE"));
        let messages = run(&team, "weather?").await;

        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[1], Err(AppError::Mcp(_))));
    }

    #[tokio::test]
    async fn test_empty_team_is_an_error() {
        let team = RoundRobinTeam::new(Vec::new(), TerminationCondition::new(6, "TERMINATE"));
        let messages = run(&team, "weather?").await;
        assert!(matches!(messages.as_slice(), [Err(AppError::Internal(_))]));
    }
}
