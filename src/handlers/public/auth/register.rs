use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::{audit, User};
use crate::error::ApiError;
use uuid::Uuid;

use super::login::issue_token;

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
}

/// POST /auth/register - create an account and sign the caller in.
///
/// New accounts always start as USER; promotion happens through the admin
/// user management endpoints.
pub async fn register(Json(payload): Json<RegisterRequest>) -> Result<(StatusCode, Json<Value>), ApiError> {
    let email = payload.email.trim().to_lowercase();
    validate_email(&email)?;
    validate_password(&payload.password)?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }

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
        ApiError::internal_server_error("Registration unavailable")
    })?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, name, phone, role, password_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, 'USER', $5, now(), now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(name)
    .bind(&payload.phone)
    .bind(&password_hash)
    .fetch_one(&pool)
    .await?;

    let token = issue_token(&user)?;

    audit::record(
        &pool,
        Some(user.id),
        "auth.register",
        "user",
        Some(user.id.to_string()),
        None,
    )
    .await;
    tracing::info!(user = %user.email, "account registered");

    Ok((StatusCode::CREATED, Json(json!({ "user": user, "token": token }))))
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !well_formed {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(validate_email("driver@linehaul.example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a@b").is_err());
    }

    #[test]
    fn password_validation() {
        assert!(validate_password("longenough1").is_ok());
        assert!(validate_password("short").is_err());
    }
}
