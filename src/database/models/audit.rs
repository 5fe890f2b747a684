use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::config;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<String>,
    pub detail: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// Append an audit row. Audit writes never fail the request that triggered
/// them; failures are logged and dropped.
pub async fn record(
    pool: &PgPool,
    actor_id: Option<Uuid>,
    action: &str,
    entity: &str,
    entity_id: Option<String>,
    detail: Option<Value>,
) {
    if !config::config().security.enable_audit_logging {
        return;
    }

    let result = sqlx::query(
        r#"
        INSERT INTO audit_logs (id, actor_id, action, entity, entity_id, detail, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(actor_id)
    .bind(action)
    .bind(entity)
    .bind(entity_id)
    .bind(detail)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::error!("failed to write audit log for {} {}: {}", action, entity, e);
    }
}
