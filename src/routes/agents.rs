//! Agent-backed endpoints
//!
//! Each handler runs its agent to completion and sends the answer as a single
//! chunk of a `text/event-stream` body.

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use crate::agents::mcp_agents::{run_mcp_agent, McpAgentKind};
use crate::agents::sql_copilot::run_sql_query_copilot;
use crate::agents::sql_toolkit::run_sql_query;
use crate::agents::web_surfer::run_web_surfer;
use crate::models::{AppState, RequestJsonData};
use crate::types::AppResult;
use crate::utils::with_deadline;
use futures::stream;
use std::convert::Infallible;
use tracing::info;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/processLLMfetchRequestForAirlineInfo/", post(process_airline_info))
        .route("/processLLMfetchRequestForFlightInfo/", post(process_flight_info))
        .route("/processLLMfetchRequestForSQLquery/", post(process_sql_query))
        .route("/processLLMfetchRequestForSQLqueryCopilot/", post(process_sql_query_copilot))
        .route("/processLLMfetchRequestForWebSurfer/", post(process_web_surfer))
        .with_state(state)
}

/// Stream body emitting `chunks` in order; no chunks means an empty body
pub fn event_stream(chunks: Vec<String>) -> Response {
    let body = Body::from_stream(stream::iter(chunks.into_iter().map(Ok::<_, Infallible>)));
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

async fn run_mcp(state: AppState, request: RequestJsonData, kind: McpAgentKind) -> AppResult<Response> {
    let text = request.text()?;
    info!(agent = ?kind, message_len = text.len(), "Received MCP agent request");

    let deadline = request.deadline(state.config.server.request_timeout_secs)?;
    let answer = with_deadline(
        deadline,
        "MCP agent",
        run_mcp_agent(kind, state.primary.clone(), &state.config.mcp, text),
    )
    .await?;

    Ok(event_stream(vec![answer]))
}

async fn process_airline_info(
    State(state): State<AppState>,
    Json(request): Json<RequestJsonData>,
) -> AppResult<Response> {
    run_mcp(state, request, McpAgentKind::AirlineInfo).await
}

async fn process_flight_info(
    State(state): State<AppState>,
    Json(request): Json<RequestJsonData>,
) -> AppResult<Response> {
    run_mcp(state, request, McpAgentKind::FlightInfo).await
}

async fn process_sql_query(
    State(state): State<AppState>,
    Json(request): Json<RequestJsonData>,
) -> AppResult<Response> {
    let text = request.text()?;
    info!(message_len = text.len(), "Received SQL agent request");

    let deadline = request.deadline(state.config.server.request_timeout_secs)?;
    let answer = with_deadline(
        deadline,
        "SQL agent",
        run_sql_query(state.primary.clone(), state.pool.clone(), state.config.mcp.max_turns, text),
    )
    .await?;

    Ok(event_stream(vec![answer]))
}

async fn process_sql_query_copilot(
    State(state): State<AppState>,
    Json(request): Json<RequestJsonData>,
) -> AppResult<Response> {
    let text = request.text()?;
    info!(message_len = text.len(), "Received SQL copilot request");

    let deadline = request.deadline(state.config.server.request_timeout_secs)?;
    let answer = with_deadline(
        deadline,
        "SQL copilot",
        run_sql_query_copilot(&state.primary, &state.pool, text),
    )
    .await?;

    Ok(event_stream(vec![answer]))
}

async fn process_web_surfer(
    State(state): State<AppState>,
    Json(request): Json<RequestJsonData>,
) -> AppResult<Response> {
    let text = request.text()?;
    info!(message_len = text.len(), "Received web surfer request");

    let deadline = request.deadline(state.config.server.request_timeout_secs)?;
    let chunks = run_web_surfer(
        state.primary.clone(),
        state.selector.clone(),
        state.screenshots.clone(),
        &state.config.mcp,
        &state.config.web_surfer,
        text,
        deadline,
    )
    .await?;

    Ok(event_stream(chunks))
}
