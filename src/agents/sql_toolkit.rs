//! SQL Toolkit Agent
//!
//! A tool-calling agent that explores the database on its own: it lists
//! tables, reads schemas, checks a query with `EXPLAIN` and then runs it.

use crate::agents::tool_agent::{ToolAgent, ToolOutput, ToolProvider};
use crate::db::{quote_ident, strip_statement, DatabaseOperations, TextRow};
use crate::llm::LLM;
use crate::types::{AppResult, ToolDefinition};
use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use tracing::info;

const SQL_AGENT_INSTRUCTIONS: &str = r#"You are an agent designed to interact with a PostgreSQL database.
Given an input question, create a syntactically correct PostgreSQL query to run, then look at the results of the query and return the answer.
Unless the user specifies a specific number of examples they wish to obtain, always limit your query to at most 10 results.
You can order the results by a relevant column to return the most interesting examples in the database.
Never query for all the columns from a specific table, only ask for the relevant columns given the question.
Only use the tools below to interact with the database and only use the information they return to construct your final answer.
Always start by listing the tables, then look at the schema of the most relevant tables.
You MUST double check your query with sql_db_query_checker before executing it. If you get an error while executing a query, rewrite the query and try again.
DO NOT make any DML statements (INSERT, UPDATE, DELETE, DROP etc.) to the database.
If the question does not seem related to the database, just return "I don't know" as the answer."#;

const SAMPLE_ROWS: usize = 3;

pub const LIST_TABLES: &str = "sql_db_list_tables";
pub const SCHEMA: &str = "sql_db_schema";
pub const QUERY_CHECKER: &str = "sql_db_query_checker";
pub const QUERY: &str = "sql_db_query";

/// Database tools exposed to the SQL agent
pub struct SqlToolkit {
    pool: PgPool,
}

impl SqlToolkit {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn schema(&self, table_names: &str) -> AppResult<ToolOutput> {
        let known = DatabaseOperations::list_tables(&self.pool).await?;
        let requested = parse_table_names(table_names);

        let missing: Vec<&str> = requested
            .iter()
            .filter(|t| !known.iter().any(|k| k == *t))
            .map(String::as_str)
            .collect();
        if requested.is_empty() || !missing.is_empty() {
            return Ok(ToolOutput::error(format!(
                "table_names {:?} not found in database",
                missing
            )));
        }

        let mut sections = Vec::with_capacity(requested.len());
        for table in &requested {
            let columns = DatabaseOperations::table_columns(&self.pool, table).await?;
            let column_lines: Vec<String> = columns
                .iter()
                .map(|c| {
                    let nullability = if c.is_nullable == "NO" { " NOT NULL" } else { "" };
                    format!("\t{} {}{}", c.column_name, c.data_type, nullability)
                })
                .collect();

            let sample_sql = format!("SELECT * FROM {} LIMIT {}", quote_ident(table), SAMPLE_ROWS);
            let samples = DatabaseOperations::fetch_text_rows(&self.pool, &sample_sql).await?;

            sections.push(format!(
                "CREATE TABLE {} (\n{}\n)\n\n/*\n{} rows from {} table:\n{}\n*/",
                table,
                column_lines.join(",\n"),
                SAMPLE_ROWS,
                table,
                format_sample_rows(&columns.iter().map(|c| c.column_name.clone()).collect::<Vec<_>>(), &samples),
            ));
        }

        Ok(ToolOutput::text(sections.join("\n\n")))
    }

    async fn check_query(&self, query: &str) -> ToolOutput {
        match DatabaseOperations::explain(&self.pool, query).await {
            Ok(()) => ToolOutput::text(format!("The query is valid:\n{}", strip_statement(query))),
            Err(e) => ToolOutput::error(format!("The query is invalid: {}", e)),
        }
    }

    async fn run_query(&self, query: &str) -> AppResult<ToolOutput> {
        if !is_read_only(query) {
            return Ok(ToolOutput::error(
                "Only read-only SELECT statements may be executed",
            ));
        }
        let rows = DatabaseOperations::fetch_text_rows(&self.pool, query).await?;
        Ok(ToolOutput::text(format_query_rows(&rows)))
    }
}

fn string_param(description: &str, name: &str) -> serde_json::Value {
    json!({
        "type": "object",
        "properties": { name: { "type": "string", "description": description } },
        "required": [name],
    })
}

/// Comma-separated list of table names, trimmed and deduplicated
pub fn parse_table_names(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// True for statements that only read data
pub fn is_read_only(sql: &str) -> bool {
    let upper = strip_statement(sql).to_uppercase();
    let starts_read = upper.starts_with("SELECT") || upper.starts_with("WITH");
    // a CTE can still wrap a data-modifying statement
    let writes = ["INSERT ", "UPDATE ", "DELETE ", "DROP ", "ALTER ", "TRUNCATE ", "CREATE "]
        .iter()
        .any(|kw| upper.contains(kw));
    starts_read && !writes && !upper.contains(';')
}

fn format_sample_rows(columns: &[String], rows: &[TextRow]) -> String {
    let mut lines = vec![columns.join("\t")];
    for row in rows {
        lines.push(
            row.col_values
                .iter()
                .map(|v| v.as_deref().unwrap_or("NULL"))
                .collect::<Vec<_>>()
                .join("\t"),
        );
    }
    lines.join("\n")
}

/// Render query results as one `column: value` line per row
pub fn format_query_rows(rows: &[TextRow]) -> String {
    if rows.is_empty() {
        return "The query returned no rows.".to_string();
    }
    rows.iter()
        .map(|row| {
            row.col_names
                .iter()
                .zip(&row.col_values)
                .map(|(name, value)| format!("{}: {}", name, value.as_deref().unwrap_or("NULL")))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn argument<'a>(arguments: &'a serde_json::Value, name: &str) -> Option<&'a str> {
    arguments.get(name).and_then(serde_json::Value::as_str)
}

#[async_trait]
impl ToolProvider for SqlToolkit {
    async fn list_tools(&self) -> AppResult<Vec<ToolDefinition>> {
        Ok(vec![
            ToolDefinition {
                name: LIST_TABLES.to_string(),
                description: "Returns a comma-separated list of the tables in the database.".to_string(),
                parameters: json!({ "type": "object", "properties": {} }),
            },
            ToolDefinition {
                name: SCHEMA.to_string(),
                description: "Returns the schema and sample rows for the given tables. \
                    Be sure the tables exist by calling sql_db_list_tables first."
                    .to_string(),
                parameters: string_param("A comma-separated list of table names", "table_names"),
            },
            ToolDefinition {
                name: QUERY_CHECKER.to_string(),
                description: "Checks whether a SQL query is valid before executing it.".to_string(),
                parameters: string_param("A detailed and correct SQL query", "query"),
            },
            ToolDefinition {
                name: QUERY.to_string(),
                description: "Executes a read-only SQL query and returns the result. \
                    If the query is not correct, an error message is returned."
                    .to_string(),
                parameters: string_param("A detailed and correct SQL query", "query"),
            },
        ])
    }

    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> AppResult<ToolOutput> {
        match name {
            LIST_TABLES => Ok(ToolOutput::text(
                DatabaseOperations::list_tables(&self.pool).await?.join(", "),
            )),
            SCHEMA => match argument(&arguments, "table_names") {
                Some(tables) => self.schema(tables).await,
                None => Ok(ToolOutput::error("missing argument 'table_names'")),
            },
            QUERY_CHECKER => match argument(&arguments, "query") {
                Some(query) => Ok(self.check_query(query).await),
                None => Ok(ToolOutput::error("missing argument 'query'")),
            },
            QUERY => match argument(&arguments, "query") {
                Some(query) => self.run_query(query).await,
                None => Ok(ToolOutput::error("missing argument 'query'")),
            },
            other => Ok(ToolOutput::error(format!("{} is not a valid tool", other))),
        }
    }
}

/// Answer `message` by letting the agent explore the database
pub async fn run_sql_query(llm: LLM, pool: PgPool, max_turns: usize, message: &str) -> AppResult<String> {
    info!(message_len = message.len(), "Running SQL toolkit agent");

    let toolkit = SqlToolkit::new(pool);
    let agent = ToolAgent::new("sql_agent", SQL_AGENT_INSTRUCTIONS, llm, max_turns).with_temperature(0.0);
    let output = agent.run(&toolkit, message).await?;

    info!(response_len = output.text.len(), "SQL toolkit agent finished");
    Ok(output.text)
}
