use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The platform's generic tenant-owned content record. Payload is
/// schemaless jsonb; history lives in the revisions table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Shard {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub kind: Option<String>,
    pub data: serde_json::Value,
    pub revision_number: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub trashed_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}
