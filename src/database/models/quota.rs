use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const RESOURCE_SHARDS: &str = "shards";
pub const RESOURCE_INSIGHTS: &str = "insights";
pub const RESOURCE_API_CLIENTS: &str = "api_clients";

pub const RESOURCES: &[&str] = &[RESOURCE_SHARDS, RESOURCE_INSIGHTS, RESOURCE_API_CLIENTS];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quota {
    pub tenant_id: Uuid,
    pub resource: String,
    pub limit_value: i64,
    pub used_value: i64,
    pub updated_at: DateTime<Utc>,
}

impl Quota {
    pub fn remaining(&self) -> i64 {
        (self.limit_value - self.used_value).max(0)
    }
}
