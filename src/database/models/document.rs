use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata for an uploaded document (PODs, weigh tickets, DVIR sheets).
/// The file bytes live in external storage; only the pointer is kept here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub job_id: Option<Uuid>,
    pub uploaded_by: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
}
