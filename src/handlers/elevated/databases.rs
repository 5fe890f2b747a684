use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::manager::DatabaseManager;
use crate::database::models::audit;
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// GET /api/admin/databases - databases visible on the server.
pub async fn list() -> Result<Json<Value>, ApiError> {
    let databases = DatabaseManager::list_databases().await?;
    Ok(Json(json!({ "databases": databases })))
}

#[derive(Debug, Deserialize)]
pub struct CreateDatabase {
    pub name: String,
}

/// POST /api/admin/databases - provision an empty database.
pub async fn create(
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<CreateDatabase>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    DatabaseManager::create_database(&payload.name).await?;

    if let Ok(pool) = DatabaseManager::main_pool().await {
        audit::record(
            &pool,
            Some(caller.id),
            "database.create",
            "database",
            Some(payload.name.clone()),
            None,
        )
        .await;
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Database created", "name": payload.name })),
    ))
}
