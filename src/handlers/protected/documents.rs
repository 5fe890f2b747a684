use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::Role;
use crate::database::manager::DatabaseManager;
use crate::database::models::Document;
use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub job_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/documents - document metadata, optionally scoped to a job.
pub async fn list(Query(query): Query<ListQuery>) -> Result<Json<Vec<Document>>, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    let documents = sqlx::query_as::<_, Document>(
        r#"
        SELECT * FROM documents
        WHERE ($1::uuid IS NULL OR job_id = $1)
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(query.job_id)
    .bind(query.limit.unwrap_or(50).clamp(1, 200))
    .bind(query.offset.unwrap_or(0).max(0))
    .fetch_all(&pool)
    .await?;

    Ok(Json(documents))
}

#[derive(Debug, Deserialize)]
pub struct CreateDocument {
    pub job_id: Option<Uuid>,
    pub file_name: String,
    pub content_type: String,
    pub storage_path: String,
}

/// POST /api/documents - register an uploaded file. The bytes themselves
/// live in external storage; this only records the pointer.
pub async fn create(
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<CreateDocument>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    for (field, value) in [
        ("file_name", &payload.file_name),
        ("content_type", &payload.content_type),
        ("storage_path", &payload.storage_path),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::bad_request(format!("{} is required", field)));
        }
    }

    let pool = DatabaseManager::main_pool().await?;
    let document = sqlx::query_as::<_, Document>(
        r#"
        INSERT INTO documents (id, job_id, uploaded_by, file_name, content_type, storage_path, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.job_id)
    .bind(caller.id)
    .bind(payload.file_name.trim())
    .bind(payload.content_type.trim())
    .bind(payload.storage_path.trim())
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(document)))
}

/// GET /api/documents/:id
pub async fn get(Path(id): Path<Uuid>) -> Result<Json<Document>, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    let document = sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Document not found"))?;

    Ok(Json(document))
}

/// DELETE /api/documents/:id - uploader or an admin only.
pub async fn delete(
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    let document = sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Document not found"))?;

    if document.uploaded_by != caller.id && caller.role != Role::Admin {
        return Err(ApiError::forbidden("Only the uploader or an admin can delete a document"));
    }

    sqlx::query("DELETE FROM documents WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "message": "Document deleted" })))
}
