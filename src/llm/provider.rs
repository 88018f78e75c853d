use crate::config::EndpointConfig;
use crate::types::{AppResult, LLMRequest, LLMResponse};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;

    /// Stream the completion as text deltas.
    ///
    /// Adapters without native streaming yield the whole completion as one chunk.
    async fn create_chat_completion_stream(
        &self,
        request: &LLMRequest,
    ) -> AppResult<BoxStream<'static, AppResult<String>>> {
        let response = self.create_chat_completion(request).await?;
        Ok(stream::once(async move { Ok(response.content) }).boxed())
    }
}

/// Build the adapter serving one configured endpoint role
pub fn adapter_for(endpoint: &EndpointConfig) -> Arc<dyn LLMAdapter> {
    Arc::new(crate::llm::openai::OpenAIAdapter::new_with_api_base(
        &endpoint.api_key,
        &endpoint.base_url,
    ))
}

/// An adapter bound to the model of its endpoint
#[derive(Clone)]
pub struct LLM {
    adapter: Arc<dyn LLMAdapter>,
    model: String,
}

impl LLM {
    pub fn new(adapter: Arc<dyn LLMAdapter>, model: impl Into<String>) -> Self {
        Self {
            adapter,
            model: model.into(),
        }
    }

    pub fn from_endpoint(endpoint: &EndpointConfig) -> Self {
        Self::new(adapter_for(endpoint), endpoint.model.clone())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn adapter(&self) -> &Arc<dyn LLMAdapter> {
        &self.adapter
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }

    pub async fn create_chat_completion_stream(
        &self,
        request: &LLMRequest,
    ) -> AppResult<BoxStream<'static, AppResult<String>>> {
        self.adapter.create_chat_completion_stream(request).await
    }
}
