use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single position report from a driver's device
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DriverLocation {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kph: Option<f64>,
    pub heading: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}
