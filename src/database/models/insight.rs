use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const VISIBILITY_PRIVATE: &str = "private";
pub const VISIBILITY_TENANT: &str = "tenant";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SharedInsight {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub author_id: Uuid,
    pub shard_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    pub visibility: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub trashed_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}
