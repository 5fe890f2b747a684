use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Role;
use crate::database::manager::DatabaseManager;
use crate::database::models::Notification;
use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/notifications - the caller's notifications, newest first.
pub async fn list(
    Extension(caller): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    let notifications = sqlx::query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE user_id = $1
          AND ($2::bool IS NOT TRUE OR read = false)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(caller.id)
    .bind(query.unread_only)
    .bind(query.limit.unwrap_or(50).clamp(1, 200))
    .bind(query.offset.unwrap_or(0).max(0))
    .fetch_all(&pool)
    .await?;

    Ok(Json(notifications))
}

#[derive(Debug, Deserialize)]
pub struct CreateNotification {
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
}

/// POST /api/notifications - notify a user. Non-admin callers may only
/// target themselves.
pub async fn create(
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<CreateNotification>,
) -> Result<(StatusCode, Json<Notification>), ApiError> {
    if payload.user_id != caller.id && caller.role != Role::Admin {
        return Err(ApiError::forbidden("Cannot notify other users"));
    }
    if payload.title.trim().is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }

    let pool = DatabaseManager::main_pool().await?;
    let notification = sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (id, user_id, title, body, read, created_at)
        VALUES ($1, $2, $3, $4, false, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.user_id)
    .bind(payload.title.trim())
    .bind(&payload.body)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(notification)))
}

/// PATCH /api/notifications/:id/read - mark one of the caller's
/// notifications as read.
pub async fn mark_read(
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    let notification = sqlx::query_as::<_, Notification>(
        r#"
        UPDATE notifications SET read = true
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(caller.id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Notification not found"))?;

    Ok(Json(notification))
}
