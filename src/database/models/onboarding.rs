use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Steps every new user walks through. Order here is display order.
pub const STEPS: &[&str] = &[
    "profile_completed",
    "first_shard_created",
    "first_insight_shared",
    "mfa_enabled",
];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OnboardingProgress {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub steps: serde_json::Value,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
