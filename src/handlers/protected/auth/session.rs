use std::time::Duration;

use axum::extract::{Extension, State};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::auth::{self, Claims};
use crate::database::manager::DatabaseManager;
use crate::database::models::{audit, User};
use crate::error::ApiError;
use crate::middleware::{AuthUser, BearerToken, GateState};

/// GET /api/auth/me - current authenticated user.
///
/// Reads the user fresh from the database so role or profile changes made
/// since the token was issued show up immediately.
pub async fn me(Extension(caller): Extension<AuthUser>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(caller.id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User account no longer exists"))?;

    Ok(Json(json!({ "user": user })))
}

/// POST /api/auth/refresh - issue a fresh token for the current caller.
pub async fn refresh(Extension(caller): Extension<AuthUser>) -> Result<Json<Value>, ApiError> {
    let claims = Claims::new(caller.id, caller.email.clone(), caller.role);
    let token = auth::generate_jwt(&claims).map_err(|e| {
        tracing::error!("token generation failed: {}", e);
        ApiError::internal_server_error("Authentication unavailable")
    })?;

    Ok(Json(json!({ "token": token, "expires_at": claims.exp })))
}

/// DELETE /api/auth/logout - revoke the presented token.
///
/// The revocation record lives exactly as long as the token would have; an
/// already-expired token has nothing left to revoke.
pub async fn logout(
    State(gate): State<GateState>,
    Extension(caller): Extension<AuthUser>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<Json<Value>, ApiError> {
    let remaining = caller.token_expires_at - Utc::now().timestamp();
    if remaining > 0 {
        gate.revocation
            .revoke(&token, Duration::from_secs(remaining as u64))
            .await?;
    }

    if let Ok(pool) = DatabaseManager::main_pool().await {
        audit::record(
            &pool,
            Some(caller.id),
            "auth.logout",
            "user",
            Some(caller.id.to_string()),
            None,
        )
        .await;
    }
    tracing::info!(user = %caller.email, "user logged out");

    Ok(Json(json!({ "message": "Logged out" })))
}
