use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::{Driver, DriverLocation};
use crate::error::ApiError;

pub const DRIVER_STATUSES: &[&str] = &["available", "on_job", "off_duty"];

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/drivers
pub async fn list(Query(query): Query<ListQuery>) -> Result<Json<Vec<Driver>>, ApiError> {
    if let Some(status) = &query.status {
        validate_status(status)?;
    }

    let pool = DatabaseManager::main_pool().await?;
    let drivers = sqlx::query_as::<_, Driver>(
        r#"
        SELECT * FROM drivers
        WHERE ($1::text IS NULL OR status = $1)
        ORDER BY name
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&query.status)
    .bind(query.limit.unwrap_or(50).clamp(1, 200))
    .bind(query.offset.unwrap_or(0).max(0))
    .fetch_all(&pool)
    .await?;

    Ok(Json(drivers))
}

#[derive(Debug, Deserialize)]
pub struct CreateDriver {
    pub name: String,
    pub phone: Option<String>,
    pub license_number: String,
    pub user_id: Option<Uuid>,
}

/// POST /api/drivers
pub async fn create(Json(payload): Json<CreateDriver>) -> Result<(StatusCode, Json<Driver>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    if payload.license_number.trim().is_empty() {
        return Err(ApiError::bad_request("license_number is required"));
    }

    let pool = DatabaseManager::main_pool().await?;
    let driver = sqlx::query_as::<_, Driver>(
        r#"
        INSERT INTO drivers (id, user_id, name, phone, license_number, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 'available', now(), now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.user_id)
    .bind(payload.name.trim())
    .bind(&payload.phone)
    .bind(payload.license_number.trim())
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(driver)))
}

/// GET /api/drivers/:id
pub async fn get(Path(id): Path<Uuid>) -> Result<Json<Driver>, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    let driver = find_driver(&pool, id).await?;
    Ok(Json(driver))
}

#[derive(Debug, Deserialize)]
pub struct UpdateDriver {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub license_number: Option<String>,
    pub status: Option<String>,
    pub user_id: Option<Uuid>,
}

/// PATCH /api/drivers/:id - partial update; absent fields keep their values.
pub async fn update(
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDriver>,
) -> Result<Json<Driver>, ApiError> {
    if let Some(status) = &payload.status {
        validate_status(status)?;
    }

    let pool = DatabaseManager::main_pool().await?;
    let driver = sqlx::query_as::<_, Driver>(
        r#"
        UPDATE drivers SET
            name = COALESCE($2, name),
            phone = COALESCE($3, phone),
            license_number = COALESCE($4, license_number),
            status = COALESCE($5, status),
            user_id = COALESCE($6, user_id),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&payload.name)
    .bind(&payload.phone)
    .bind(&payload.license_number)
    .bind(&payload.status)
    .bind(payload.user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Driver not found"))?;

    Ok(Json(driver))
}

/// DELETE /api/drivers/:id
pub async fn delete(Path(id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    let deleted = sqlx::query("DELETE FROM drivers WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Driver not found"));
    }

    Ok(Json(json!({ "message": "Driver deleted" })))
}

#[derive(Debug, Deserialize)]
pub struct LocationReport {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kph: Option<f64>,
    pub heading: Option<f64>,
}

/// POST /api/drivers/:id/location - record a position report.
///
/// Realtime quota class; driver apps send these continuously while on a job.
pub async fn record_location(
    Path(id): Path<Uuid>,
    Json(payload): Json<LocationReport>,
) -> Result<(StatusCode, Json<DriverLocation>), ApiError> {
    if !(-90.0..=90.0).contains(&payload.latitude) {
        return Err(ApiError::bad_request("latitude must be between -90 and 90"));
    }
    if !(-180.0..=180.0).contains(&payload.longitude) {
        return Err(ApiError::bad_request("longitude must be between -180 and 180"));
    }

    let pool = DatabaseManager::main_pool().await?;
    find_driver(&pool, id).await?;

    let location = sqlx::query_as::<_, DriverLocation>(
        r#"
        INSERT INTO driver_locations (id, driver_id, latitude, longitude, speed_kph, heading, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(id)
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(payload.speed_kph)
    .bind(payload.heading)
    .fetch_one(&pool)
    .await?;

    sqlx::query("UPDATE drivers SET last_seen_at = now() WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok((StatusCode::CREATED, Json(location)))
}

/// POST /api/drivers/:id/heartbeat - liveness ping from the driver app.
///
/// Realtime quota class.
pub async fn heartbeat(Path(id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    let updated = sqlx::query_as::<_, Driver>(
        "UPDATE drivers SET last_seen_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Driver not found"))?;

    Ok(Json(json!({ "status": "ok", "last_seen_at": updated.last_seen_at })))
}

#[derive(Debug, Deserialize)]
pub struct LocationsQuery {
    pub limit: Option<i64>,
}

/// GET /api/drivers/:id/locations - recent position reports, newest first.
pub async fn locations(
    Path(id): Path<Uuid>,
    Query(query): Query<LocationsQuery>,
) -> Result<Json<Vec<DriverLocation>>, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    find_driver(&pool, id).await?;

    let locations = sqlx::query_as::<_, DriverLocation>(
        r#"
        SELECT * FROM driver_locations
        WHERE driver_id = $1
        ORDER BY recorded_at DESC
        LIMIT $2
        "#,
    )
    .bind(id)
    .bind(query.limit.unwrap_or(100).clamp(1, 1000))
    .fetch_all(&pool)
    .await?;

    Ok(Json(locations))
}

async fn find_driver(pool: &sqlx::PgPool, id: Uuid) -> Result<Driver, ApiError> {
    sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Driver not found"))
}

fn validate_status(status: &str) -> Result<(), ApiError> {
    if !DRIVER_STATUSES.contains(&status) {
        return Err(ApiError::bad_request(format!(
            "Invalid status '{}', expected one of: {}",
            status,
            DRIVER_STATUSES.join(", ")
        )));
    }
    Ok(())
}
