use axum::extract::Query;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::AuditLog;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub actor_id: Option<Uuid>,
    pub entity: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/admin/audit - audit trail, newest first.
pub async fn list(Query(query): Query<ListQuery>) -> Result<Json<Vec<AuditLog>>, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    let entries = sqlx::query_as::<_, AuditLog>(
        r#"
        SELECT * FROM audit_logs
        WHERE ($1::uuid IS NULL OR actor_id = $1)
          AND ($2::text IS NULL OR entity = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(query.actor_id)
    .bind(&query.entity)
    .bind(query.limit.unwrap_or(100).clamp(1, 500))
    .bind(query.offset.unwrap_or(0).max(0))
    .fetch_all(&pool)
    .await?;

    Ok(Json(entries))
}
