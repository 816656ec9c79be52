use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const PLAN_FREE: &str = "free";
pub const PLAN_TEAM: &str = "team";
pub const PLAN_ENTERPRISE: &str = "enterprise";

pub const PLANS: &[&str] = &[PLAN_FREE, PLAN_TEAM, PLAN_ENTERPRISE];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub plan: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub trashed_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}
