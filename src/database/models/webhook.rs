use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const EVENT_SHARD_CREATED: &str = "shard.created";
pub const EVENT_SHARD_UPDATED: &str = "shard.updated";
pub const EVENT_SHARD_TRASHED: &str = "shard.trashed";
pub const EVENT_SHARD_REVERTED: &str = "shard.reverted";

pub const EVENTS: &[&str] = &[
    EVENT_SHARD_CREATED,
    EVENT_SHARD_UPDATED,
    EVENT_SHARD_TRASHED,
    EVENT_SHARD_REVERTED,
];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Webhook {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub url: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub events: Vec<String>,
    pub active: bool,
    pub failure_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Webhook {
    pub fn subscribes_to(&self, event: &str) -> bool {
        self.events.iter().any(|e| e == event)
    }
}
