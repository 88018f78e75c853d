//! Folds the classified event stream into text candidates and saved images

use super::events::{MessagePart, StreamEvent, TeamMessage};
use super::screenshots::{SavedImage, ScreenshotStore};
use crate::types::AppResult;
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

/// Everything gathered from one run, in arrival order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collected {
    pub texts: Vec<String>,
    pub images: Vec<SavedImage>,
    pub image_parts_seen: usize,
    pub image_failures: usize,
}

pub struct ContentCollector<'a> {
    store: &'a ScreenshotStore,
    collected: Collected,
}

impl<'a> ContentCollector<'a> {
    pub fn new(store: &'a ScreenshotStore) -> Self {
        Self {
            store,
            collected: Collected::default(),
        }
    }

    pub async fn push(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Text(text) => self.collected.texts.push(text),
            StreamEvent::MultiModal(parts) => {
                let mut buffer = Vec::new();
                for part in parts {
                    match part {
                        MessagePart::Text(text) => buffer.push(text),
                        MessagePart::Image(image) => {
                            self.collected.image_parts_seen += 1;
                            match self.store.save(&image).await {
                                Ok(saved) => self.collected.images.push(saved),
                                Err(e) => {
                                    self.collected.image_failures += 1;
                                    warn!(
                                        error = %e,
                                        image_index = self.collected.image_parts_seen,
                                        "Failed to persist screenshot, skipping"
                                    );
                                }
                            }
                        }
                    }
                }
                if !buffer.is_empty() {
                    self.collected.texts.push(buffer.join(" "));
                }
            }
            StreamEvent::Other => {}
        }
    }

    pub fn finish(self) -> Collected {
        self.collected
    }
}

/// Drain `stream` in order. The first upstream error aborts collection.
pub async fn collect_stream<S>(stream: S, store: &ScreenshotStore) -> AppResult<Collected>
where
    S: Stream<Item = AppResult<TeamMessage>>,
{
    futures::pin_mut!(stream);
    let mut collector = ContentCollector::new(store);

    while let Some(message) = stream.next().await {
        collector.push(StreamEvent::from(message?)).await;
    }

    let collected = collector.finish();
    debug!(
        texts = collected.texts.len(),
        images = collected.images.len(),
        image_failures = collected.image_failures,
        "Stream drained"
    );
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::super::events::ChatMessage;
    use super::super::screenshots::testing::{png, ScriptedClock};
    use super::*;
    use crate::types::{AppError, ImageData};

    fn store(dir: &std::path::Path) -> ScreenshotStore {
        ScreenshotStore::acquire(dir, "/static/screenshots")
            .unwrap()
            .with_clock(ScriptedClock::new(&[1, 2, 3, 4]))
    }

    #[tokio::test]
    async fn test_text_and_multimodal_text_are_candidates() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let messages = vec![
            Ok(TeamMessage::Chat(ChatMessage::text("user", "weather in St. Charles"))),
            Ok(TeamMessage::Chat(ChatMessage::multimodal(
                "web_surfer",
                vec![
                    MessagePart::Text("I searched".into()),
                    MessagePart::Image(png(b"1")),
                    MessagePart::Text("for the weather.".into()),
                ],
            ))),
            Ok(TeamMessage::Chat(ChatMessage::multimodal("web_surfer", vec![MessagePart::Image(png(b"2"))]))),
            Ok(TeamMessage::TaskResult { stop_reason: "max".into(), message_count: 3 }),
        ];

        let collected = collect_stream(futures::stream::iter(messages), &store).await.unwrap();

        assert_eq!(collected.texts, vec!["weather in St. Charles", "I searched for the weather."]);
        assert_eq!(collected.images.len(), 2);
        assert_eq!(collected.image_parts_seen, 2);
        assert_ne!(collected.images[0].file_path, collected.images[1].file_path);
    }

    #[tokio::test]
    async fn test_bad_second_image_does_not_stop_collection() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let not_png = ImageData::new(b"GIF89a".to_vec(), "image/gif");
        let messages = vec![
            Ok(TeamMessage::Chat(ChatMessage::multimodal(
                "web_surfer",
                vec![
                    MessagePart::Image(png(b"first")),
                    MessagePart::Image(not_png),
                    MessagePart::Image(png(b"third")),
                    MessagePart::Text("page loaded".into()),
                ],
            ))),
            Ok(TeamMessage::Chat(ChatMessage::text("assistant", "- sunny"))),
        ];

        let collected = collect_stream(futures::stream::iter(messages), &store).await.unwrap();

        assert_eq!(collected.image_parts_seen, 3);
        assert_eq!(collected.image_failures, 1);
        assert_eq!(collected.images.len(), 2);
        assert!(std::fs::read(&collected.images[1].file_path).unwrap().ends_with(b"third"));
        assert_eq!(collected.texts, vec!["page loaded", "- sunny"]);
    }

    #[tokio::test]
    async fn test_upstream_error_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let messages = vec![
            Ok(TeamMessage::Chat(ChatMessage::text("user", "task"))),
            Err(AppError::LLMApi("connection reset".into())),
        ];

        let err = collect_stream(futures::stream::iter(messages), &store).await.unwrap_err();
        assert!(matches!(err, AppError::LLMApi(_)));
    }
}
