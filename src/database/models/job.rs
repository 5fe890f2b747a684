use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    /// Human-facing dispatch reference, e.g. LH-2024-0193
    pub reference: String,
    pub customer_name: String,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub material: Option<String>,
    pub weight_tons: Option<f64>,
    /// pending | assigned | in_transit | completed | cancelled
    pub status: String,
    pub driver_id: Option<Uuid>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const JOB_STATUSES: &[&str] = &["pending", "assigned", "in_transit", "completed", "cancelled"];
