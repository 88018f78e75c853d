use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use crate::models::{AppState, RequestJsonData};
use crate::types::{AppResult, LLMMessage, LLMRequest};
use crate::utils::{stream_with_deadline, with_deadline};
use tracing::info;

/// Completion cap for the raw chat proxy
const RAW_CHAT_MAX_TOKENS: u32 = 500;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/processLLMfetchRequest", post(process_llm_fetch_request))
        .with_state(state)
}

/// Forward the request text to the primary model and stream the deltas back
pub async fn process_llm_fetch_request(
    State(state): State<AppState>,
    Json(request): Json<RequestJsonData>,
) -> AppResult<Response> {
    let text = request.text()?;
    info!(message_len = text.len(), "Received chat request");

    let mut llm_request = LLMRequest::new(state.primary.model(), vec![LLMMessage::user(text)]);
    llm_request.max_tokens = Some(RAW_CHAT_MAX_TOKENS);

    let deadline = request.deadline(state.config.server.request_timeout_secs)?;
    let deltas = with_deadline(
        deadline,
        "chat completion",
        state.primary.create_chat_completion_stream(&llm_request),
    )
    .await?;

    let body = Body::from_stream(stream_with_deadline(deadline, "chat completion stream", deltas));
    Ok(([(header::CONTENT_TYPE, "text/event-stream")], body).into_response())
}
