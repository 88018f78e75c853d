//! SQL Copilot
//!
//! Turns a natural-language request into one SQL statement for the flight
//! operations schema, validates it with `EXPLAIN`, runs it, and renders the
//! outcome as plain text.

use crate::db::{DatabaseOperations, TextRow};
use crate::llm::LLM;
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = r#"You are an assistant that generates SQL queries based on user input.
Database schema:
CREATE TABLE IF NOT EXISTS airports
(
    airport_id INTEGER GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    airport_name character varying(100) NOT NULL,
    location character varying(100)
);
CREATE TABLE IF NOT EXISTS pilots
(
    pilot_id INTEGER GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    first_name character varying(50) NOT NULL,
    last_name character varying(50) NOT NULL,
    email character varying(100) NOT NULL,
    phone_number character varying(15),
    hire_date date NOT NULL
);
CREATE TABLE IF NOT EXISTS flight_delays
(
    flight_delay_id INTEGER GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    delay_date date NOT NULL,
    airport_id INTEGER NOT NULL,
    pilot_id INTEGER NOT NULL,
    flight_delay_minutes INTEGER NOT NULL,
    flight_delay_reason character varying(255)
);
Examples:
- Input: "List the database tables"
  Output: SELECT table_name FROM information_schema.tables WHERE table_type = 'BASE TABLE' AND table_schema = 'public';
- Input: "List all the columns in the airports table"
  Output: SELECT column_name FROM information_schema.columns WHERE table_name = 'airports';
- Input: "Show me airport locations"
  Output: SELECT airport_name, location FROM airports;
- Input: "Show me flight delays."
  Output: SELECT delay_date, flight_delay_reason FROM flight_delays;

Respond with a JSON object with exactly two string fields:
{"sql_query": "<one SQL statement>", "explanation": "<what the statement does>"}"#;

pub const FAILED_MESSAGE: &str = "Failed to execute SQL query.";
pub const NO_DATA_MESSAGE: &str = "Query executed successfully but returned no data.";

/// Structured output requested from the model
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SqlQuery {
    pub sql_query: String,
    pub explanation: String,
}

/// What running a validated statement produced
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Command tag such as `UPDATE 3`
    Modification(String),
    Rows(Vec<TextRow>),
}

/// Generate, validate and run the SQL for `message`
pub async fn run_sql_query_copilot(llm: &LLM, pool: &PgPool, message: &str) -> AppResult<String> {
    let query = generate_query(llm, message).await?;
    info!(sql = %query.sql_query, explanation = %query.explanation, "Generated SQL query");

    match validate_and_execute(pool, &query.sql_query).await {
        Ok(outcome) => Ok(render_outcome(outcome)),
        Err(e) => {
            warn!(error = %e, sql = %query.sql_query, "SQL query validation/execution failed");
            Ok(FAILED_MESSAGE.to_string())
        }
    }
}

pub async fn generate_query(llm: &LLM, message: &str) -> AppResult<SqlQuery> {
    let mut request = LLMRequest::new(llm.model(), vec![LLMMessage::user(message)]);
    request.system_instruction = Some(SYSTEM_PROMPT.to_string());
    request.json_output = true;

    let response = llm.create_chat_completion(&request).await?;
    parse_sql_query(&response.content)
}

/// Parse the model's JSON answer, tolerating a surrounding code fence
pub fn parse_sql_query(raw: &str) -> AppResult<SqlQuery> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let query: SqlQuery = serde_json::from_str(body)
        .map_err(|e| AppError::LLMApi(format!("model did not return a SQL query object: {}", e)))?;

    if query.sql_query.trim().is_empty() {
        return Err(AppError::LLMApi("model returned an empty SQL query".to_string()));
    }
    Ok(query)
}

/// Leading verb of a data-modifying statement, if it is one
pub fn modification_verb(sql: &str) -> Option<&'static str> {
    let upper = sql.trim_start().to_uppercase();
    ["UPDATE", "DELETE", "INSERT"]
        .into_iter()
        .find(|verb| upper.starts_with(verb))
}

/// Postgres-style command tag for a modification
pub fn command_tag(verb: &str, rows_affected: u64) -> String {
    match verb {
        "INSERT" => format!("INSERT 0 {}", rows_affected),
        _ => format!("{} {}", verb, rows_affected),
    }
}

pub async fn validate_and_execute(pool: &PgPool, sql: &str) -> AppResult<QueryOutcome> {
    DatabaseOperations::explain(pool, sql).await?;
    info!("SQL query is valid");

    match modification_verb(sql) {
        Some(verb) => {
            let rows = DatabaseOperations::execute_modification(pool, sql).await?;
            Ok(QueryOutcome::Modification(command_tag(verb, rows)))
        }
        None => Ok(QueryOutcome::Rows(DatabaseOperations::fetch_text_rows(pool, sql).await?)),
    }
}

/// One line per row, column values joined with `" - "`
pub fn format_rows(rows: &[TextRow]) -> String {
    rows.iter()
        .map(|row| {
            row.col_values
                .iter()
                .map(|value| value.as_deref().unwrap_or("None"))
                .collect::<Vec<_>>()
                .join(" - ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_outcome(outcome: QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Modification(tag) => format!("SQL modification executed successfully: {}", tag),
        QueryOutcome::Rows(rows) if rows.is_empty() => NO_DATA_MESSAGE.to_string(),
        QueryOutcome::Rows(rows) => format_rows(&rows),
    }
}
