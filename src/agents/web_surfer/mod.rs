//! Web-surfing team
//!
//! A web surfer and an assistant take turns on the user's task. Their messages
//! are consumed in order:
//!
//! ```text
//! team stream ──► classify ──► collect (texts, screenshots)
//!                                  │
//!                                  ▼
//!                       select (one completion when texts exist)
//!                                  │
//!                                  ▼
//!                       render (text + <img> markup)
//! ```
//!
//! The run and the selection share one deadline; expiry surfaces as
//! [`AppError::Timeout`](crate::types::AppError::Timeout).

pub mod collector;
pub mod events;
pub mod participants;
pub mod renderer;
pub mod screenshots;
pub mod selector;
pub mod team;

use crate::config::{McpConfig, WebSurferConfig};
use crate::llm::LLM;
use crate::mcp::McpToolServer;
use crate::types::AppResult;
use crate::utils::with_deadline;
use collector::collect_stream;
use participants::{AssistantParticipant, WebSurferParticipant};
use screenshots::ScreenshotStore;
use selector::Selector;
use std::sync::Arc;
use team::{AgentTeam, RoundRobinTeam, TeamParticipant, TerminationCondition};
use tokio::time::Instant;
use tracing::{info, warn};

pub struct WebSurferHandler {
    team: Arc<dyn AgentTeam>,
    selector: Selector,
    screenshots: Arc<ScreenshotStore>,
}

impl WebSurferHandler {
    pub fn new(team: Arc<dyn AgentTeam>, selector: Selector, screenshots: Arc<ScreenshotStore>) -> Self {
        Self {
            team,
            selector,
            screenshots,
        }
    }

    /// Run the team on `task` and return at most one rendered response
    pub async fn run(&self, task: &str, deadline: Instant) -> AppResult<Vec<String>> {
        let collected = with_deadline(
            deadline,
            "web surfer run",
            collect_stream(self.team.run_stream(task.to_string()), &self.screenshots),
        )
        .await?;

        let selected = with_deadline(deadline, "response selection", self.selector.select(&collected.texts)).await?;

        Ok(renderer::render(selected, &collected.images))
    }
}

/// Start the browser server, run the team on `task`, and stop the server
pub async fn run_web_surfer(
    primary: LLM,
    selector: LLM,
    screenshots: Arc<ScreenshotStore>,
    mcp: &McpConfig,
    config: &WebSurferConfig,
    task: &str,
    deadline: Instant,
) -> AppResult<Vec<String>> {
    info!(message_len = task.len(), "Running web surfer team");

    let browser = Arc::new(
        with_deadline(
            deadline,
            "browser startup",
            McpToolServer::spawn("browser", &mcp.browser_command, &[]),
        )
        .await?,
    );

    let participants: Vec<Arc<dyn TeamParticipant>> = vec![
        Arc::new(WebSurferParticipant::new(primary.clone(), browser.clone(), mcp.max_turns)),
        Arc::new(AssistantParticipant::new(primary)),
    ];
    let team = RoundRobinTeam::new(
        participants,
        TerminationCondition::new(config.max_messages, config.termination_keyword.clone()),
    );
    let handler = WebSurferHandler::new(Arc::new(team), Selector::new(selector), screenshots);

    let result = handler.run(task, deadline).await;
    drop(handler);

    match Arc::try_unwrap(browser) {
        Ok(server) => server.shutdown().await,
        Err(_) => warn!("Browser server still referenced after the run, leaving it to drop"),
    }

    if let Ok(response) = &result {
        info!(parts = response.len(), "Web surfer team finished");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::events::{ChatMessage, MessagePart, TeamMessage};
    use super::screenshots::testing::{png, ScriptedClock};
    use super::*;
    use crate::agents::tool_agent::testing::{answer, ScriptedLLM};
    use crate::types::{AppError, ImageData};
    use futures::stream::{self, BoxStream, StreamExt};
    use std::time::Duration;

    /// Replays a fixed list of messages, optionally stalling at the end
    struct ReplayTeam {
        messages: Vec<TeamMessage>,
        stall: bool,
    }

    impl AgentTeam for ReplayTeam {
        fn run_stream<'a>(&'a self, _task: String) -> BoxStream<'a, AppResult<TeamMessage>> {
            let replay = stream::iter(self.messages.clone().into_iter().map(Ok));
            if self.stall {
                replay.chain(stream::pending()).boxed()
            } else {
                replay.boxed()
            }
        }
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        llm: Arc<ScriptedLLM>,
        handler: WebSurferHandler,
    }

    fn fixture(messages: Vec<TeamMessage>, replies: Vec<&str>, stall: bool) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let store = ScreenshotStore::acquire(tmp.path(), "/static/screenshots")
            .unwrap()
            .with_clock(ScriptedClock::new(&[10, 11, 12]));
        let llm = ScriptedLLM::new(replies.into_iter().map(answer).collect());
        let handler = WebSurferHandler::new(
            Arc::new(ReplayTeam { messages, stall }),
            Selector::new(LLM::new(llm.clone(), "llama3.1")),
            Arc::new(store),
        );
        Fixture { _tmp: tmp, llm, handler }
    }

    fn text(source: &str, body: &str) -> TeamMessage {
        TeamMessage::Chat(ChatMessage::text(source, body))
    }

    fn images(count: usize) -> TeamMessage {
        TeamMessage::Chat(ChatMessage::multimodal(
            "web_surfer",
            (0..count).map(|i| MessagePart::Image(png(&[i as u8]))).collect(),
        ))
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn test_selector_sees_all_candidates_and_its_choice_is_returned() {
        let candidates = ["weather?", "Found forecast page", "- High 72F\n- Low 55F", "Summary: mild"];
        let f = fixture(
            candidates.iter().map(|c| text("x", c)).collect(),
            vec!["- High 72F\n- Low 55F"],
            false,
        );

        let out = f.handler.run("weather?", deadline()).await.unwrap();

        assert_eq!(out, vec!["- High 72F\n- Low 55F".to_string()]);
        assert!(candidates.contains(&out[0].as_str()));
        let requests = f.llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let prompt = &requests[0].messages[1].content;
        let positions: Vec<usize> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| prompt.find(&format!("{}. {}", i + 1, c)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_single_candidate_still_selects() {
        let f = fixture(vec![text("user", "weather?")], vec!["weather?"], false);
        let out = f.handler.run("weather?", deadline()).await.unwrap();
        assert_eq!(out, vec!["weather?".to_string()]);
        assert_eq!(f.llm.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_images_only_render_tags_without_text() {
        let f = fixture(vec![images(2)], vec![], false);
        let out = f.handler.run("weather?", deadline()).await.unwrap();

        assert_eq!(out.len(), 1);
        let lines: Vec<&str> = out[0].lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.starts_with("<img src=\"/static/screenshots/screenshot_")));
        assert!(f.llm.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_collected_is_empty() {
        let f = fixture(
            vec![TeamMessage::TaskResult { stop_reason: "max".into(), message_count: 0 }],
            vec![],
            false,
        );
        assert!(f.handler.run("weather?", deadline()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_and_image() {
        let f = fixture(vec![text("assistant", "- sunny"), images(1)], vec!["- sunny"], false);
        let out = f.handler.run("weather?", deadline()).await.unwrap();

        let tag = renderer::image_tag("/static/screenshots/screenshot_20250314_150926_000010.png");
        assert_eq!(out, vec![format!("- sunny\n\n{}", tag)]);
    }

    #[tokio::test]
    async fn test_bad_image_is_skipped() {
        let messages = vec![
            TeamMessage::Chat(ChatMessage::multimodal(
                "web_surfer",
                vec![
                    MessagePart::Image(png(b"1")),
                    MessagePart::Image(ImageData::new(b"not a png".to_vec(), "image/png")),
                    MessagePart::Image(png(b"3")),
                ],
            )),
            text("assistant", "- done"),
        ];
        let f = fixture(messages, vec!["- done"], false);

        let out = f.handler.run("weather?", deadline()).await.unwrap();
        assert_eq!(out[0].matches("<img ").count(), 2);
        assert!(out[0].starts_with("- done\n\n"));
    }

    #[tokio::test]
    async fn test_stalled_run_times_out() {
        let f = fixture(vec![text("user", "weather?")], vec!["unused"], true);
        let err = f
            .handler
            .run("weather?", Instant::now() + Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
        assert!(f.llm.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_selector_failure_is_fatal() {
        let f = fixture(vec![text("user", "weather?")], vec![], false);
        let err = f.handler.run("weather?", deadline()).await.unwrap_err();
        assert!(matches!(err, AppError::LLMApi(_)));
    }
}
