use axum::extract::{Path, Query};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::browser::{self, TablePage};
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;

/// GET /api/admin/tables - browsable tables in the application database.
pub async fn list() -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    let tables = browser::list_tables(&pool).await?;
    Ok(Json(json!({ "tables": tables })))
}

#[derive(Debug, Deserialize)]
pub struct RowsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/admin/tables/:table/rows - paginated raw rows.
pub async fn rows(
    Path(table): Path<String>,
    Query(query): Query<RowsQuery>,
) -> Result<Json<TablePage>, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    let page = browser::fetch_rows(
        &pool,
        &table,
        query.limit.unwrap_or(50),
        query.offset.unwrap_or(0),
    )
    .await?;

    Ok(Json(page))
}
