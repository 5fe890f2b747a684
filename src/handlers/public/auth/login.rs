use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{self, Claims, Role};
use crate::database::manager::DatabaseManager;
use crate::database::models::{audit, User};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/login - verify credentials and issue a token.
///
/// Emits the raw `{ user, token }` body; the format layer reshapes it for
/// older client generations.
pub async fn login(Json(payload): Json<LoginRequest>) -> Result<Json<Value>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let pool = DatabaseManager::main_pool().await?;
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let password_ok = bcrypt::verify(&payload.password, &user.password_hash).map_err(|e| {
        tracing::error!("password verification failed: {}", e);
        ApiError::internal_server_error("Authentication unavailable")
    })?;
    if !password_ok {
        tracing::debug!(email = %email, "login rejected: bad password");
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let token = issue_token(&user)?;

    audit::record(
        &pool,
        Some(user.id),
        "auth.login",
        "user",
        Some(user.id.to_string()),
        None,
    )
    .await;
    tracing::info!(user = %user.email, "user logged in");

    Ok(Json(json!({ "user": user, "token": token })))
}

pub(super) fn issue_token(user: &User) -> Result<String, ApiError> {
    let role = user.role.parse::<Role>().map_err(|e| {
        tracing::error!("user {} has unusable role: {}", user.id, e);
        ApiError::internal_server_error("Authentication unavailable")
    })?;

    let claims = Claims::new(user.id, user.email.clone(), role);
    auth::generate_jwt(&claims).map_err(|e| {
        tracing::error!("token generation failed: {}", e);
        ApiError::internal_server_error("Authentication unavailable")
    })
}
