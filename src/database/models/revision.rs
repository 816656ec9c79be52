use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const STRATEGY_SNAPSHOT: &str = "snapshot";
pub const STRATEGY_DELTA: &str = "delta";

/// One entry in a shard's history. `data` is either the full payload
/// (snapshot) or just the fields changed by that update (delta).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Revision {
    pub id: Uuid,
    pub shard_id: Uuid,
    pub tenant_id: Uuid,
    pub revision_number: i32,
    pub strategy: String,
    pub data: serde_json::Value,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Revision {
    pub fn is_snapshot(&self) -> bool {
        self.strategy == STRATEGY_SNAPSHOT
    }
}
