//! Generic table browser for the admin console.
//!
//! Tables are addressed by name at runtime, so identifiers are validated
//! against the catalog before being interpolated, and rows come back as raw
//! JSON via row_to_json rather than through typed models.

use serde::Serialize;
use serde_json::Value;
use sqlx::{PgPool, Row};

use super::manager::{DatabaseError, DatabaseManager};

#[derive(Debug, Serialize)]
pub struct TablePage {
    pub table: String,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub rows: Vec<Value>,
}

/// List browsable (public schema, base) tables.
pub async fn list_tables(pool: &PgPool) -> Result<Vec<String>, DatabaseError> {
    let rows = sqlx::query(
        r#"
        SELECT table_name
        FROM information_schema.tables
        WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
        ORDER BY table_name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| row.get::<String, _>("table_name"))
        .collect())
}

/// Fetch a page of rows from `table` as raw JSON objects.
///
/// The table name must both pass the identifier check and exist in the
/// catalog; anything else is rejected before SQL is built.
pub async fn fetch_rows(
    pool: &PgPool,
    table: &str,
    limit: i64,
    offset: i64,
) -> Result<TablePage, DatabaseError> {
    if !DatabaseManager::is_valid_identifier(table) {
        return Err(DatabaseError::InvalidIdentifier(table.to_string()));
    }
    if !table_exists(pool, table).await? {
        return Err(DatabaseError::NotFound(format!("table '{}'", table)));
    }

    let limit = limit.clamp(1, 500);
    let offset = offset.max(0);

    let count_sql = format!("SELECT COUNT(*) AS total FROM \"{}\"", table);
    let total: i64 = sqlx::query(&count_sql)
        .fetch_one(pool)
        .await?
        .get("total");

    let rows_sql = format!(
        "SELECT row_to_json(t) AS row FROM (SELECT * FROM \"{}\" ORDER BY 1 LIMIT $1 OFFSET $2) t",
        table
    );
    let rows = sqlx::query(&rows_sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let rows = rows
        .iter()
        .map(|row| row.try_get::<Value, _>("row").unwrap_or(Value::Null))
        .collect();

    Ok(TablePage {
        table: table.to_string(),
        total,
        limit,
        offset,
        rows,
    })
}

async fn table_exists(pool: &PgPool, table: &str) -> Result<bool, DatabaseError> {
    let row = sqlx::query(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM information_schema.tables
            WHERE table_schema = 'public' AND table_type = 'BASE TABLE' AND table_name = $1
        ) AS present
        "#,
    )
    .bind(table)
    .fetch_one(pool)
    .await?;

    Ok(row.get::<bool, _>("present"))
}
