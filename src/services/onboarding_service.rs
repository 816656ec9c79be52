use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::onboarding::{OnboardingProgress, STEPS};

#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("Unknown onboarding step: {0}")]
    UnknownStep(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for OnboardingError {
    fn from(err: sqlx::Error) -> Self {
        OnboardingError::Database(DatabaseError::Sqlx(err))
    }
}

fn default_steps() -> Value {
    let mut map = Map::new();
    for step in STEPS {
        map.insert(step.to_string(), Value::Bool(false));
    }
    Value::Object(map)
}

fn all_steps_done(steps: &Value) -> bool {
    STEPS
        .iter()
        .all(|step| steps.get(*step).and_then(Value::as_bool).unwrap_or(false))
}

/// Fetch the caller's progress, creating the default row on first touch
pub async fn get_or_create(
    user_id: Uuid,
    tenant_id: Uuid,
) -> Result<OnboardingProgress, OnboardingError> {
    let pool = DatabaseManager::pool().await?;

    sqlx::query(
        "INSERT INTO onboarding_progress (user_id, tenant_id, steps)
         VALUES ($1, $2, $3)
         ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(tenant_id)
    .bind(default_steps())
    .execute(&pool)
    .await?;

    let progress = sqlx::query_as::<_, OnboardingProgress>(
        "SELECT * FROM onboarding_progress WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;
    Ok(progress)
}

/// Flip one step; completed_at tracks whether every step is done
pub async fn set_step(
    user_id: Uuid,
    tenant_id: Uuid,
    step: &str,
    done: bool,
) -> Result<OnboardingProgress, OnboardingError> {
    if !STEPS.contains(&step) {
        return Err(OnboardingError::UnknownStep(step.to_string()));
    }

    let current = get_or_create(user_id, tenant_id).await?;
    let mut steps = current
        .steps
        .as_object()
        .cloned()
        .unwrap_or_else(|| default_steps().as_object().cloned().unwrap_or_default());
    steps.insert(step.to_string(), Value::Bool(done));
    let steps = Value::Object(steps);
    let completed = all_steps_done(&steps);

    let pool = DatabaseManager::pool().await?;
    let progress = sqlx::query_as::<_, OnboardingProgress>(
        "UPDATE onboarding_progress
         SET steps = $2,
             completed_at = CASE WHEN $3 THEN COALESCE(completed_at, now()) ELSE NULL END,
             updated_at = now()
         WHERE user_id = $1
         RETURNING *",
    )
    .bind(user_id)
    .bind(&steps)
    .bind(completed)
    .fetch_one(&pool)
    .await?;
    Ok(progress)
}

/// Best-effort step completion fired from other flows (e.g. first shard
/// created). Errors are logged and swallowed.
pub fn mark_step(user_id: Uuid, tenant_id: Uuid, step: &'static str) {
    tokio::spawn(async move {
        if let Err(e) = set_step(user_id, tenant_id, step, true).await {
            tracing::debug!("Onboarding step {} not recorded: {}", step, e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_steps_cover_all_and_start_false() {
        let steps = default_steps();
        let map = steps.as_object().unwrap();
        assert_eq!(map.len(), STEPS.len());
        assert!(map.values().all(|v| v == &Value::Bool(false)));
        assert!(!all_steps_done(&steps));
    }

    #[test]
    fn completion_requires_every_step() {
        let mut map = default_steps().as_object().cloned().unwrap();
        for step in STEPS.iter().take(STEPS.len() - 1) {
            map.insert(step.to_string(), Value::Bool(true));
        }
        assert!(!all_steps_done(&Value::Object(map.clone())));
        map.insert(STEPS[STEPS.len() - 1].to_string(), Value::Bool(true));
        assert!(all_steps_done(&Value::Object(map)));
    }

    #[test]
    fn missing_or_malformed_step_counts_as_incomplete() {
        assert!(!all_steps_done(&json!({})));
        assert!(!all_steps_done(&json!({"profile_completed": "yes"})));
    }
}
