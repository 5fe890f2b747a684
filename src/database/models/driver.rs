use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Driver {
    pub id: Uuid,
    /// Login account for drivers who use the mobile app
    pub user_id: Option<Uuid>,
    pub name: String,
    pub phone: Option<String>,
    pub license_number: String,
    /// available | on_job | off_duty
    pub status: String,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
