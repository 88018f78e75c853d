use crate::agents::web_surfer::screenshots::ScreenshotStore;
use crate::config::Config;
use crate::llm::LLM;
use crate::types::{AppError, AppResult};
use crate::utils::deadline_after;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    /// Model behind the chat proxy and every agent
    pub primary: LLM,
    /// Model that picks the final web-surfer response
    pub selector: LLM,
    pub screenshots: Arc<ScreenshotStore>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, screenshots: ScreenshotStore) -> Self {
        Self {
            primary: LLM::from_endpoint(&config.llm.primary),
            selector: LLM::from_endpoint(&config.llm.selector),
            pool,
            config,
            screenshots: Arc::new(screenshots),
        }
    }
}

/// Body shared by every `processLLMfetchRequest*` endpoint
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RequestJsonData {
    #[serde(rename = "userRequestText")]
    pub user_request_text: String,
    /// Overrides the configured request deadline
    #[serde(rename = "timeoutSeconds", default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl RequestJsonData {
    /// The request text as sent, rejecting blank input
    pub fn text(&self) -> AppResult<&str> {
        if self.user_request_text.trim().is_empty() {
            return Err(AppError::InvalidRequest("userRequestText must not be empty".to_string()));
        }
        Ok(&self.user_request_text)
    }

    pub fn deadline(&self, default_secs: u64) -> AppResult<Instant> {
        deadline_after(self.timeout_seconds.unwrap_or(default_secs))
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub database: String,
}
