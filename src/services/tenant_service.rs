use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::tenant::Tenant;
use crate::database::page::{Page, PageResponse};
use crate::services::quota_service;

#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    #[error("Tenant already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid tenant name: {0}")]
    InvalidName(String),
    #[error("Tenant not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for TenantError {
    fn from(err: sqlx::Error) -> Self {
        TenantError::Database(DatabaseError::Sqlx(err))
    }
}

/// Validate tenant name follows rules
pub fn validate_tenant_name(name: &str) -> Result<(), TenantError> {
    if name.len() < 2 {
        return Err(TenantError::InvalidName(
            "Tenant name must be at least 2 characters".to_string(),
        ));
    }
    if name.len() > 100 {
        return Err(TenantError::InvalidName(
            "Tenant name must be less than 100 characters".to_string(),
        ));
    }
    // Only allow alphanumeric, hyphens, and underscores
    if !name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(TenantError::InvalidName(
            "Tenant name can only contain letters, numbers, hyphens, and underscores".to_string(),
        ));
    }
    Ok(())
}

/// Create a tenant and seed its plan's default quotas in one transaction
pub async fn create(name: &str, display_name: &str, plan: &str) -> Result<Tenant, TenantError> {
    validate_tenant_name(name)?;

    let pool = DatabaseManager::pool().await?;
    let mut tx = pool.begin().await?;

    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM tenants WHERE name = $1 AND deleted_at IS NULL")
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;
    if existing.is_some() {
        return Err(TenantError::AlreadyExists(name.to_string()));
    }

    let tenant = sqlx::query_as::<_, Tenant>(
        "INSERT INTO tenants (name, display_name, plan, active)
         VALUES ($1, $2, $3, true)
         RETURNING *",
    )
    .bind(name)
    .bind(display_name)
    .bind(plan)
    .fetch_one(&mut *tx)
    .await?;

    quota_service::seed_defaults(&mut *tx, tenant.id, plan)
        .await
        .map_err(|e| match e {
            quota_service::QuotaError::Database(db) => TenantError::Database(db),
            other => TenantError::InvalidName(other.to_string()),
        })?;

    tx.commit().await?;
    Ok(tenant)
}

pub async fn get(id: Uuid) -> Result<Tenant, TenantError> {
    let pool = DatabaseManager::pool().await?;
    sqlx::query_as::<_, Tenant>(
        "SELECT * FROM tenants WHERE id = $1 AND trashed_at IS NULL AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(TenantError::NotFound)
}

/// Lookup used by login; inactive tenants are returned so the caller can
/// distinguish "no such tenant" from "tenant suspended"
pub async fn get_by_name(name: &str) -> Result<Option<Tenant>, TenantError> {
    let pool = DatabaseManager::pool().await?;
    let tenant = sqlx::query_as::<_, Tenant>(
        "SELECT * FROM tenants WHERE name = $1 AND trashed_at IS NULL AND deleted_at IS NULL",
    )
    .bind(name)
    .fetch_optional(&pool)
    .await?;
    Ok(tenant)
}

pub async fn list(page: &Page) -> Result<PageResponse<Tenant>, TenantError> {
    let pool = DatabaseManager::pool().await?;

    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM tenants WHERE trashed_at IS NULL AND deleted_at IS NULL",
    )
    .fetch_one(&pool)
    .await?;

    let items = sqlx::query_as::<_, Tenant>(&format!(
        "SELECT * FROM tenants
         WHERE trashed_at IS NULL AND deleted_at IS NULL
         ORDER BY {} LIMIT $1 OFFSET $2",
        page.order_sql()
    ))
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(&pool)
    .await?;

    Ok(PageResponse {
        items,
        total,
        limit: page.limit,
        offset: page.offset,
    })
}

pub async fn update(
    id: Uuid,
    display_name: Option<String>,
    plan: Option<String>,
    active: Option<bool>,
) -> Result<Tenant, TenantError> {
    let pool = DatabaseManager::pool().await?;
    sqlx::query_as::<_, Tenant>(
        "UPDATE tenants
         SET display_name = COALESCE($2, display_name),
             plan = COALESCE($3, plan),
             active = COALESCE($4, active),
             updated_at = now()
         WHERE id = $1 AND trashed_at IS NULL AND deleted_at IS NULL
         RETURNING *",
    )
    .bind(id)
    .bind(display_name)
    .bind(plan)
    .bind(active)
    .fetch_optional(&pool)
    .await?
    .ok_or(TenantError::NotFound)
}

pub async fn trash(id: Uuid) -> Result<Tenant, TenantError> {
    let pool = DatabaseManager::pool().await?;
    sqlx::query_as::<_, Tenant>(
        "UPDATE tenants SET trashed_at = now(), updated_at = now()
         WHERE id = $1 AND trashed_at IS NULL AND deleted_at IS NULL
         RETURNING *",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(TenantError::NotFound)
}

pub async fn restore(id: Uuid) -> Result<Tenant, TenantError> {
    let pool = DatabaseManager::pool().await?;
    sqlx::query_as::<_, Tenant>(
        "UPDATE tenants SET trashed_at = NULL, updated_at = now()
         WHERE id = $1 AND trashed_at IS NOT NULL AND deleted_at IS NULL
         RETURNING *",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(TenantError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_tenant_names() {
        assert!(validate_tenant_name("acme-corp").is_ok());
        assert!(validate_tenant_name("acme_2").is_ok());
        assert!(validate_tenant_name("a").is_err());
        assert!(validate_tenant_name("bad name").is_err());
        assert!(validate_tenant_name("drop;table").is_err());
        assert!(validate_tenant_name(&"x".repeat(101)).is_err());
    }
}
