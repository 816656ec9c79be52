use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::ai_model::{AiModel, MODEL_KINDS};
use crate::services::audit_service;

#[derive(Debug, thiserror::Error)]
pub enum AiModelError {
    #[error("Unknown model kind: {0}")]
    UnknownKind(String),
    #[error("Model configuration not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for AiModelError {
    fn from(err: sqlx::Error) -> Self {
        AiModelError::Database(DatabaseError::Sqlx(err))
    }
}

pub fn validate_kind(kind: &str) -> Result<(), AiModelError> {
    if MODEL_KINDS.contains(&kind) {
        Ok(())
    } else {
        Err(AiModelError::UnknownKind(kind.to_string()))
    }
}

/// A model config as seen by one tenant: its own override when present,
/// otherwise the platform default
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveModel {
    pub model_kind: String,
    pub endpoint_url: Option<String>,
    pub enabled: bool,
    pub params: Value,
    pub source: &'static str,
}

/// Merge tenant overrides over platform defaults, one entry per known
/// kind. Kinds with neither row come back disabled and unconfigured.
fn merge_effective(defaults: &[AiModel], overrides: &[AiModel]) -> Vec<EffectiveModel> {
    MODEL_KINDS
        .iter()
        .map(|kind| {
            if let Some(row) = overrides.iter().find(|m| m.model_kind == *kind) {
                EffectiveModel {
                    model_kind: row.model_kind.clone(),
                    endpoint_url: row.endpoint_url.clone(),
                    enabled: row.enabled,
                    params: row.params.clone(),
                    source: "tenant",
                }
            } else if let Some(row) = defaults.iter().find(|m| m.model_kind == *kind) {
                EffectiveModel {
                    model_kind: row.model_kind.clone(),
                    endpoint_url: row.endpoint_url.clone(),
                    enabled: row.enabled,
                    params: row.params.clone(),
                    source: "default",
                }
            } else {
                EffectiveModel {
                    model_kind: kind.to_string(),
                    endpoint_url: None,
                    enabled: false,
                    params: json!({}),
                    source: "default",
                }
            }
        })
        .collect()
}

/// Effective configuration for a tenant across all known kinds
pub async fn effective_for_tenant(tenant_id: Uuid) -> Result<Vec<EffectiveModel>, AiModelError> {
    let pool = DatabaseManager::pool().await?;
    let rows = sqlx::query_as::<_, AiModel>(
        "SELECT * FROM ai_models WHERE tenant_id IS NULL OR tenant_id = $1",
    )
    .bind(tenant_id)
    .fetch_all(&pool)
    .await?;

    let (overrides, defaults): (Vec<AiModel>, Vec<AiModel>) =
        rows.into_iter().partition(|m| m.tenant_id.is_some());
    Ok(merge_effective(&defaults, &overrides))
}

/// Raw rows for one scope: a tenant's overrides, or the platform
/// defaults when tenant_id is None
pub async fn list_scope(tenant_id: Option<Uuid>) -> Result<Vec<AiModel>, AiModelError> {
    let pool = DatabaseManager::pool().await?;
    let rows = sqlx::query_as::<_, AiModel>(
        "SELECT * FROM ai_models WHERE tenant_id IS NOT DISTINCT FROM $1 ORDER BY model_kind",
    )
    .bind(tenant_id)
    .fetch_all(&pool)
    .await?;
    Ok(rows)
}

/// Create or update the row for (scope, kind)
pub async fn upsert(
    tenant_id: Option<Uuid>,
    actor_id: Uuid,
    kind: &str,
    endpoint_url: Option<String>,
    enabled: Option<bool>,
    params: Option<Value>,
) -> Result<AiModel, AiModelError> {
    validate_kind(kind)?;

    let pool = DatabaseManager::pool().await?;
    let mut tx = pool.begin().await?;

    // tenant_id is nullable, so plain ON CONFLICT can't target the pair
    let updated = sqlx::query_as::<_, AiModel>(
        "UPDATE ai_models
         SET endpoint_url = COALESCE($3, endpoint_url),
             enabled = COALESCE($4, enabled),
             params = COALESCE($5, params),
             updated_at = now()
         WHERE tenant_id IS NOT DISTINCT FROM $1 AND model_kind = $2
         RETURNING *",
    )
    .bind(tenant_id)
    .bind(kind)
    .bind(&endpoint_url)
    .bind(enabled)
    .bind(&params)
    .fetch_optional(&mut *tx)
    .await?;

    let model = match updated {
        Some(model) => model,
        None => {
            sqlx::query_as::<_, AiModel>(
                "INSERT INTO ai_models (tenant_id, model_kind, endpoint_url, enabled, params)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING *",
            )
            .bind(tenant_id)
            .bind(kind)
            .bind(&endpoint_url)
            .bind(enabled.unwrap_or(false))
            .bind(params.unwrap_or_else(|| json!({})))
            .fetch_one(&mut *tx)
            .await?
        }
    };

    tx.commit().await?;

    if let Some(tenant) = tenant_id {
        audit_service::record(
            tenant,
            Some(actor_id),
            "ai_model.upsert",
            "ai_model",
            Some(model.id),
            json!({ "model_kind": kind, "enabled": model.enabled }),
        );
    }

    Ok(model)
}

/// Remove an override (or a platform default when scope is None)
pub async fn delete(tenant_id: Option<Uuid>, kind: &str) -> Result<(), AiModelError> {
    validate_kind(kind)?;
    let pool = DatabaseManager::pool().await?;
    let deleted = sqlx::query(
        "DELETE FROM ai_models WHERE tenant_id IS NOT DISTINCT FROM $1 AND model_kind = $2",
    )
    .bind(tenant_id)
    .bind(kind)
    .execute(&pool)
    .await?;
    if deleted.rows_affected() == 0 {
        return Err(AiModelError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn model(tenant_id: Option<Uuid>, kind: &str, enabled: bool) -> AiModel {
        AiModel {
            id: Uuid::new_v4(),
            tenant_id,
            model_kind: kind.to_string(),
            endpoint_url: Some(format!("https://ml.example.com/{}", kind)),
            enabled,
            params: json!({"threshold": 0.5}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn kind_validation() {
        assert!(validate_kind("win_probability").is_ok());
        assert!(validate_kind("forecast").is_ok());
        assert!(validate_kind("gpt").is_err());
    }

    #[test]
    fn tenant_override_wins_over_default() {
        let tenant = Uuid::new_v4();
        let defaults = vec![model(None, "win_probability", true)];
        let overrides = vec![model(Some(tenant), "win_probability", false)];
        let merged = merge_effective(&defaults, &overrides);

        let win = merged
            .iter()
            .find(|m| m.model_kind == "win_probability")
            .unwrap();
        assert_eq!(win.source, "tenant");
        assert!(!win.enabled);
    }

    #[test]
    fn every_kind_is_represented() {
        let merged = merge_effective(&[], &[]);
        assert_eq!(merged.len(), MODEL_KINDS.len());
        assert!(merged.iter().all(|m| !m.enabled && m.source == "default"));
    }

    #[test]
    fn defaults_fill_uncovered_kinds() {
        let defaults = vec![model(None, "anomaly", true)];
        let merged = merge_effective(&defaults, &[]);
        let anomaly = merged.iter().find(|m| m.model_kind == "anomaly").unwrap();
        assert!(anomaly.enabled);
        assert_eq!(anomaly.source, "default");
    }
}
