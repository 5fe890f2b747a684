use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::{audit, job::JOB_STATUSES, Job};
use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub driver_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/jobs - list hauling jobs, newest first.
pub async fn list(Query(query): Query<ListQuery>) -> Result<Json<Vec<Job>>, ApiError> {
    if let Some(status) = &query.status {
        validate_status(status)?;
    }

    let pool = DatabaseManager::main_pool().await?;
    let jobs = sqlx::query_as::<_, Job>(
        r#"
        SELECT * FROM jobs
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::uuid IS NULL OR driver_id = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(&query.status)
    .bind(query.driver_id)
    .bind(query.limit.unwrap_or(50).clamp(1, 200))
    .bind(query.offset.unwrap_or(0).max(0))
    .fetch_all(&pool)
    .await?;

    Ok(Json(jobs))
}

#[derive(Debug, Deserialize)]
pub struct CreateJob {
    pub customer_name: String,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub material: Option<String>,
    pub weight_tons: Option<f64>,
    pub driver_id: Option<Uuid>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// POST /api/jobs - create a job. Starts pending unless a driver is attached
/// at creation, in which case it goes straight to assigned.
pub async fn create(
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<CreateJob>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    for (field, value) in [
        ("customer_name", &payload.customer_name),
        ("pickup_address", &payload.pickup_address),
        ("dropoff_address", &payload.dropoff_address),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::bad_request(format!("{} is required", field)));
        }
    }

    let status = if payload.driver_id.is_some() { "assigned" } else { "pending" };
    let reference = new_reference();

    let pool = DatabaseManager::main_pool().await?;
    let job = sqlx::query_as::<_, Job>(
        r#"
        INSERT INTO jobs (
            id, reference, customer_name, pickup_address, dropoff_address,
            material, weight_tons, status, driver_id, scheduled_for, notes,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now(), now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&reference)
    .bind(payload.customer_name.trim())
    .bind(payload.pickup_address.trim())
    .bind(payload.dropoff_address.trim())
    .bind(&payload.material)
    .bind(payload.weight_tons)
    .bind(status)
    .bind(payload.driver_id)
    .bind(payload.scheduled_for)
    .bind(&payload.notes)
    .fetch_one(&pool)
    .await?;

    audit::record(
        &pool,
        Some(caller.id),
        "job.create",
        "job",
        Some(job.id.to_string()),
        Some(json!({ "reference": job.reference })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/jobs/:id
pub async fn get(Path(id): Path<Uuid>) -> Result<Json<Job>, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
pub struct UpdateJob {
    pub customer_name: Option<String>,
    pub pickup_address: Option<String>,
    pub dropoff_address: Option<String>,
    pub material: Option<String>,
    pub weight_tons: Option<f64>,
    pub status: Option<String>,
    pub driver_id: Option<Uuid>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// PATCH /api/jobs/:id - partial update; absent fields keep their values.
pub async fn update(
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateJob>,
) -> Result<Json<Job>, ApiError> {
    if let Some(status) = &payload.status {
        validate_status(status)?;
    }

    let pool = DatabaseManager::main_pool().await?;
    let job = sqlx::query_as::<_, Job>(
        r#"
        UPDATE jobs SET
            customer_name = COALESCE($2, customer_name),
            pickup_address = COALESCE($3, pickup_address),
            dropoff_address = COALESCE($4, dropoff_address),
            material = COALESCE($5, material),
            weight_tons = COALESCE($6, weight_tons),
            status = COALESCE($7, status),
            driver_id = COALESCE($8, driver_id),
            scheduled_for = COALESCE($9, scheduled_for),
            notes = COALESCE($10, notes),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&payload.customer_name)
    .bind(&payload.pickup_address)
    .bind(&payload.dropoff_address)
    .bind(&payload.material)
    .bind(payload.weight_tons)
    .bind(&payload.status)
    .bind(payload.driver_id)
    .bind(payload.scheduled_for)
    .bind(&payload.notes)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(job))
}

/// DELETE /api/jobs/:id
pub async fn delete(
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::main_pool().await?;
    let deleted = sqlx::query("DELETE FROM jobs WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Job not found"));
    }

    audit::record(
        &pool,
        Some(caller.id),
        "job.delete",
        "job",
        Some(id.to_string()),
        None,
    )
    .await;

    Ok(Json(json!({ "message": "Job deleted" })))
}

fn validate_status(status: &str) -> Result<(), ApiError> {
    if !JOB_STATUSES.contains(&status) {
        return Err(ApiError::bad_request(format!(
            "Invalid status '{}', expected one of: {}",
            status,
            JOB_STATUSES.join(", ")
        )));
    }
    Ok(())
}

/// Dispatch references look like LH-3F9A2C41.
fn new_reference() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("LH-{}", id[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_validation() {
        assert!(validate_status("pending").is_ok());
        assert!(validate_status("in_transit").is_ok());
        assert!(validate_status("parked").is_err());
    }

    #[test]
    fn references_are_prefixed_and_unique() {
        let a = new_reference();
        let b = new_reference();
        assert!(a.starts_with("LH-"));
        assert_eq!(a.len(), 11);
        assert_ne!(a, b);
    }
}
