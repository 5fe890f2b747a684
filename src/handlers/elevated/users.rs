use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::Role;
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::{audit, User};
use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub role: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/admin/users
pub async fn list(Query(query): Query<ListQuery>) -> Result<Json<Vec<User>>, ApiError> {
    if let Some(role) = &query.role {
        parse_role(role)?;
    }

    let pool = DatabaseManager::main_pool().await?;
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE ($1::text IS NULL OR role = $1)
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&query.role)
    .bind(query.limit.unwrap_or(50).clamp(1, 200))
    .bind(query.offset.unwrap_or(0).max(0))
    .fetch_all(&pool)
    .await?;

    Ok(Json(users))
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: Option<String>,
}

/// POST /api/admin/users - create an account, optionally with a role.
pub async fn create(
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<CreateUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::bad_request("Password must be at least 8 characters"));
    }
    let role = match &payload.role {
        Some(role) => parse_role(role)?,
        None => Role::User,
    };

    let pool = DatabaseManager::main_pool().await?;

    let taken: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&pool)
        .await?;
    if taken.is_some() {
        return Err(ApiError::conflict("Email is already registered"));
    }

    let cost = config::config().security.bcrypt_cost;
    let password_hash = bcrypt::hash(&payload.password, cost).map_err(|e| {
        tracing::error!("password hashing failed: {}", e);
        ApiError::internal_server_error("User creation unavailable")
    })?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, name, phone, role, password_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, now(), now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(payload.name.trim())
    .bind(&payload.phone)
    .bind(role.as_str())
    .bind(&password_hash)
    .fetch_one(&pool)
    .await?;

    audit::record(
        &pool,
        Some(caller.id),
        "user.create",
        "user",
        Some(user.id.to_string()),
        Some(json!({ "role": user.role })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/admin/users/:id
pub async fn get(Path(id): Path<Uuid>) -> Result<Json<User>, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
}

/// PATCH /api/admin/users/:id - update profile fields or role.
pub async fn update(
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUser>,
) -> Result<Json<User>, ApiError> {
    if let Some(role) = &payload.role {
        parse_role(role)?;
        // An admin demoting themselves locks everyone out of this console.
        if id == caller.id && role.as_str() != Role::Admin.as_str() {
            return Err(ApiError::bad_request("Cannot change your own role"));
        }
    }

    let pool = DatabaseManager::main_pool().await?;
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            name = COALESCE($2, name),
            phone = COALESCE($3, phone),
            role = COALESCE($4, role),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&payload.name)
    .bind(&payload.phone)
    .bind(&payload.role)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    audit::record(
        &pool,
        Some(caller.id),
        "user.update",
        "user",
        Some(id.to_string()),
        None,
    )
    .await;

    Ok(Json(user))
}

/// DELETE /api/admin/users/:id
pub async fn delete(
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    if id == caller.id {
        return Err(ApiError::bad_request("Cannot delete your own account"));
    }

    let pool = DatabaseManager::main_pool().await?;
    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    audit::record(
        &pool,
        Some(caller.id),
        "user.delete",
        "user",
        Some(id.to_string()),
        None,
    )
    .await;

    Ok(Json(json!({ "message": "User deleted" })))
}

fn parse_role(role: &str) -> Result<Role, ApiError> {
    role.parse::<Role>()
        .map_err(|_| ApiError::bad_request("Invalid role, expected USER or ADMIN"))
}
