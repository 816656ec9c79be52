use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const KIND_WIN_PROBABILITY: &str = "win_probability";
pub const KIND_RISK_SCORING: &str = "risk_scoring";
pub const KIND_ANOMALY: &str = "anomaly";
pub const KIND_FORECAST: &str = "forecast";
pub const KIND_TRAJECTORY: &str = "trajectory";

pub const MODEL_KINDS: &[&str] = &[
    KIND_WIN_PROBABILITY,
    KIND_RISK_SCORING,
    KIND_ANOMALY,
    KIND_FORECAST,
    KIND_TRAJECTORY,
];

/// Pointer at an externally-deployed scoring model. A row with
/// tenant_id = NULL is the platform default for its kind; tenant rows
/// override it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AiModel {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub model_kind: String,
    pub endpoint_url: Option<String>,
    pub enabled: bool,
    pub params: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
