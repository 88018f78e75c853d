use crate::types::AppResult;
use sqlx::PgPool;

/// A result row with every column rendered as text, in select-list order
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TextRow {
    pub col_names: Vec<String>,
    pub col_values: Vec<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: String,
}

/// Trim whitespace and any trailing semicolons from a single statement
pub fn strip_statement(sql: &str) -> &str {
    sql.trim().trim_end_matches(';').trim_end()
}

/// Quote an identifier for interpolation into SQL text
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub struct DatabaseOperations;

impl DatabaseOperations {
    /// Ask Postgres to plan the statement without running it
    pub async fn explain(pool: &PgPool, sql: &str) -> AppResult<()> {
        sqlx::query(&format!("EXPLAIN {}", strip_statement(sql)))
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Run a data-modifying statement, returning the affected row count
    pub async fn execute_modification(pool: &PgPool, sql: &str) -> AppResult<u64> {
        let result = sqlx::query(strip_statement(sql)).execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// Run a query and return each row as ordered (column, text value) pairs.
    ///
    /// The statement is wrapped so Postgres renders the values; no per-type
    /// decoding happens on this side.
    pub async fn fetch_text_rows(pool: &PgPool, sql: &str) -> AppResult<Vec<TextRow>> {
        let wrapped = format!(
            r#"
            SELECT
                ARRAY(SELECT e.key FROM json_each_text(row_to_json(q)) WITH ORDINALITY AS e(key, value, ord) ORDER BY e.ord) AS col_names,
                ARRAY(SELECT e.value FROM json_each_text(row_to_json(q)) WITH ORDINALITY AS e(key, value, ord) ORDER BY e.ord) AS col_values
            FROM ({}) AS q
            "#,
            strip_statement(sql)
        );

        let rows = sqlx::query_as::<_, TextRow>(&wrapped)
            .fetch_all(pool)
            .await?;

        Ok(rows)
    }

    pub async fn list_tables(pool: &PgPool) -> AppResult<Vec<String>> {
        let tables = sqlx::query_scalar::<_, String>(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_type = 'BASE TABLE' AND table_schema = 'public'
            ORDER BY table_name
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(tables)
    }

    pub async fn table_columns(pool: &PgPool, table: &str) -> AppResult<Vec<ColumnInfo>> {
        let columns = sqlx::query_as::<_, ColumnInfo>(
            r#"
            SELECT column_name::text AS column_name,
                   data_type::text AS data_type,
                   is_nullable::text AS is_nullable
            FROM information_schema.columns
            WHERE table_schema = 'public' AND table_name = $1
            ORDER BY ordinal_position
            "#,
        )
        .bind(table)
        .fetch_all(pool)
        .await?;

        Ok(columns)
    }
}
