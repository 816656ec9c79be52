use sqlx::PgConnection;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::quota::{self, Quota};
use crate::database::models::tenant;

#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    #[error("Quota exceeded for {resource}")]
    Exceeded { resource: String },
    #[error("Unknown quota resource: {0}")]
    UnknownResource(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for QuotaError {
    fn from(err: sqlx::Error) -> Self {
        QuotaError::Database(DatabaseError::Sqlx(err))
    }
}

/// Per-plan default limits, seeded when a tenant is created
pub fn defaults_for_plan(plan: &str) -> &'static [(&'static str, i64)] {
    match plan {
        tenant::PLAN_ENTERPRISE => &[
            (quota::RESOURCE_SHARDS, 100_000),
            (quota::RESOURCE_INSIGHTS, 50_000),
            (quota::RESOURCE_API_CLIENTS, 100),
        ],
        tenant::PLAN_TEAM => &[
            (quota::RESOURCE_SHARDS, 10_000),
            (quota::RESOURCE_INSIGHTS, 5_000),
            (quota::RESOURCE_API_CLIENTS, 20),
        ],
        // free and anything unrecognized
        _ => &[
            (quota::RESOURCE_SHARDS, 500),
            (quota::RESOURCE_INSIGHTS, 200),
            (quota::RESOURCE_API_CLIENTS, 3),
        ],
    }
}

pub fn validate_resource(resource: &str) -> Result<(), QuotaError> {
    if quota::RESOURCES.contains(&resource) {
        Ok(())
    } else {
        Err(QuotaError::UnknownResource(resource.to_string()))
    }
}

/// Insert default quota rows for a new tenant (inside its creation tx)
pub async fn seed_defaults(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    plan: &str,
) -> Result<(), QuotaError> {
    for (resource, limit) in defaults_for_plan(plan) {
        sqlx::query(
            "INSERT INTO quotas (tenant_id, resource, limit_value, used_value, updated_at)
             VALUES ($1, $2, $3, 0, now())
             ON CONFLICT (tenant_id, resource) DO NOTHING",
        )
        .bind(tenant_id)
        .bind(resource)
        .bind(limit)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn list(tenant_id: Uuid) -> Result<Vec<Quota>, QuotaError> {
    let pool = DatabaseManager::pool().await?;
    let quotas = sqlx::query_as::<_, Quota>(
        "SELECT * FROM quotas WHERE tenant_id = $1 ORDER BY resource",
    )
    .bind(tenant_id)
    .fetch_all(&pool)
    .await?;
    Ok(quotas)
}

/// Set the limit for one resource. Lowering below current usage is
/// allowed; it only blocks further creates.
pub async fn set_limit(
    tenant_id: Uuid,
    resource: &str,
    limit_value: i64,
) -> Result<Quota, QuotaError> {
    validate_resource(resource)?;
    let pool = DatabaseManager::pool().await?;
    let quota = sqlx::query_as::<_, Quota>(
        "INSERT INTO quotas (tenant_id, resource, limit_value, used_value, updated_at)
         VALUES ($1, $2, $3, 0, now())
         ON CONFLICT (tenant_id, resource)
         DO UPDATE SET limit_value = EXCLUDED.limit_value, updated_at = now()
         RETURNING *",
    )
    .bind(tenant_id)
    .bind(resource)
    .bind(limit_value)
    .fetch_one(&pool)
    .await?;
    Ok(quota)
}

/// Atomically claim one unit of a resource. A tenant with no quota row
/// for the resource is treated as unlimited.
pub async fn consume(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    resource: &str,
) -> Result<(), QuotaError> {
    let updated = sqlx::query(
        "UPDATE quotas
         SET used_value = used_value + 1, updated_at = now()
         WHERE tenant_id = $1 AND resource = $2 AND used_value < limit_value",
    )
    .bind(tenant_id)
    .bind(resource)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 1 {
        return Ok(());
    }

    let exists: Option<(i64,)> =
        sqlx::query_as("SELECT limit_value FROM quotas WHERE tenant_id = $1 AND resource = $2")
            .bind(tenant_id)
            .bind(resource)
            .fetch_optional(&mut *conn)
            .await?;

    match exists {
        Some(_) => Err(QuotaError::Exceeded {
            resource: resource.to_string(),
        }),
        None => Ok(()),
    }
}

/// Return one unit of a resource (floor at zero)
pub async fn release(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    resource: &str,
) -> Result<(), QuotaError> {
    sqlx::query(
        "UPDATE quotas
         SET used_value = GREATEST(used_value - 1, 0), updated_at = now()
         WHERE tenant_id = $1 AND resource = $2",
    )
    .bind(tenant_id)
    .bind(resource)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plans_scale_monotonically() {
        let free = defaults_for_plan(tenant::PLAN_FREE);
        let team = defaults_for_plan(tenant::PLAN_TEAM);
        let enterprise = defaults_for_plan(tenant::PLAN_ENTERPRISE);
        for ((r1, free_limit), ((_, team_limit), (_, ent_limit))) in
            free.iter().zip(team.iter().zip(enterprise.iter()))
        {
            assert!(quota::RESOURCES.contains(r1));
            assert!(free_limit < team_limit);
            assert!(team_limit < ent_limit);
        }
    }

    #[test]
    fn unknown_plan_falls_back_to_free() {
        assert_eq!(defaults_for_plan("mystery"), defaults_for_plan("free"));
    }

    #[test]
    fn resource_validation() {
        assert!(validate_resource("shards").is_ok());
        assert!(matches!(
            validate_resource("gpus"),
            Err(QuotaError::UnknownResource(_))
        ));
    }
}
