//! Picks the single best-formatted candidate among the collected texts

use crate::llm::LLM;
use crate::types::{AppResult, LLMMessage, LLMRequest};
use tracing::info;

pub const SELECTION_INSTRUCTION: &str = "You will be given several candidate responses, numbered in the order they were produced. \
Choose the candidate that uses bullet-point formatting. If more than one candidate uses bullet points, choose the most comprehensive of them. \
If no candidate uses bullet points, choose the most detailed candidate. \
Return the chosen candidate verbatim, exactly as written, with no added commentary, numbering or explanation.";

/// Candidates numbered `1..N` in arrival order
pub fn build_selection_prompt(candidates: &[String]) -> String {
    let mut prompt = String::from("Candidate responses:\n");
    for (index, candidate) in candidates.iter().enumerate() {
        prompt.push_str(&format!("\n{}. {}\n", index + 1, candidate));
    }
    prompt
}

#[derive(Clone)]
pub struct Selector {
    llm: LLM,
}

impl Selector {
    pub fn new(llm: LLM) -> Self {
        Self { llm }
    }

    /// `None` without calling the model when there are no candidates;
    /// otherwise exactly one deterministic completion, even for a single
    /// candidate.
    pub async fn select(&self, candidates: &[String]) -> AppResult<Option<String>> {
        if candidates.is_empty() {
            return Ok(None);
        }

        info!(candidates = candidates.len(), model = %self.llm.model(), "Selecting final response");

        let mut request = LLMRequest::new(
            self.llm.model(),
            vec![
                LLMMessage::system(SELECTION_INSTRUCTION),
                LLMMessage::user(build_selection_prompt(candidates)),
            ],
        );
        request.temperature = Some(0.0);

        let response = self.llm.create_chat_completion(&request).await?;
        Ok(Some(response.content))
    }
}
