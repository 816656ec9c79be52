use serde_json::json;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::insight::SharedInsight;
use crate::database::models::quota::RESOURCE_INSIGHTS;
use crate::database::page::{Page, PageResponse};
use crate::services::{audit_service, quota_service};

#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    #[error("Insight not found")]
    NotFound,
    #[error("Only the author or a tenant admin may modify this insight")]
    NotAuthor,
    #[error(transparent)]
    Quota(#[from] quota_service::QuotaError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for InsightError {
    fn from(err: sqlx::Error) -> Self {
        InsightError::Database(DatabaseError::Sqlx(err))
    }
}

/// Tenant-visible insights plus the caller's own private ones
pub async fn list(
    tenant_id: Uuid,
    caller_id: Uuid,
    shard_id: Option<Uuid>,
    page: &Page,
) -> Result<PageResponse<SharedInsight>, InsightError> {
    let pool = DatabaseManager::pool().await?;

    let mut conditions = String::from(
        "tenant_id = $1 AND trashed_at IS NULL AND deleted_at IS NULL
         AND (visibility = 'tenant' OR author_id = $2)",
    );
    let mut next_param = 3;
    if shard_id.is_some() {
        conditions.push_str(&format!(" AND shard_id = ${}", next_param));
        next_param += 1;
    }

    let count_sql = format!("SELECT COUNT(*) FROM shared_insights WHERE {}", conditions);
    let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql)
        .bind(tenant_id)
        .bind(caller_id);
    if let Some(shard) = shard_id {
        count_query = count_query.bind(shard);
    }
    let (total,) = count_query.fetch_one(&pool).await?;

    let list_sql = format!(
        "SELECT * FROM shared_insights WHERE {} ORDER BY {} LIMIT ${} OFFSET ${}",
        conditions,
        page.order_sql(),
        next_param,
        next_param + 1
    );
    let mut list_query = sqlx::query_as::<_, SharedInsight>(&list_sql)
        .bind(tenant_id)
        .bind(caller_id);
    if let Some(shard) = shard_id {
        list_query = list_query.bind(shard);
    }
    let items = list_query
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

pub async fn get(
    tenant_id: Uuid,
    caller_id: Uuid,
    id: Uuid,
) -> Result<SharedInsight, InsightError> {
    let pool = DatabaseManager::pool().await?;
    sqlx::query_as::<_, SharedInsight>(
        "SELECT * FROM shared_insights
         WHERE id = $1 AND tenant_id = $2 AND trashed_at IS NULL AND deleted_at IS NULL
           AND (visibility = 'tenant' OR author_id = $3)",
    )
    .bind(id)
    .bind(tenant_id)
    .bind(caller_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(InsightError::NotFound)
}

pub async fn create(
    tenant_id: Uuid,
    author_id: Uuid,
    title: &str,
    body: &str,
    shard_id: Option<Uuid>,
    visibility: &str,
) -> Result<SharedInsight, InsightError> {
    let pool = DatabaseManager::pool().await?;
    let mut tx = pool.begin().await?;

    quota_service::consume(&mut *tx, tenant_id, RESOURCE_INSIGHTS).await?;

    let insight = sqlx::query_as::<_, SharedInsight>(
        "INSERT INTO shared_insights (tenant_id, author_id, shard_id, title, body, visibility)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(tenant_id)
    .bind(author_id)
    .bind(shard_id)
    .bind(title)
    .bind(body)
    .bind(visibility)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    audit_service::record(
        tenant_id,
        Some(author_id),
        "insight.create",
        "insight",
        Some(insight.id),
        json!({ "title": insight.title, "visibility": insight.visibility }),
    );

    Ok(insight)
}

async fn load_for_modify(
    pool: &sqlx::PgPool,
    tenant_id: Uuid,
    caller_id: Uuid,
    caller_is_admin: bool,
    id: Uuid,
) -> Result<SharedInsight, InsightError> {
    let insight = sqlx::query_as::<_, SharedInsight>(
        "SELECT * FROM shared_insights
         WHERE id = $1 AND tenant_id = $2 AND trashed_at IS NULL AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?
    .ok_or(InsightError::NotFound)?;

    if insight.author_id != caller_id && !caller_is_admin {
        return Err(InsightError::NotAuthor);
    }
    Ok(insight)
}

/// Changing visibility to `tenant` is the share operation
pub async fn update(
    tenant_id: Uuid,
    caller_id: Uuid,
    caller_is_admin: bool,
    id: Uuid,
    title: Option<String>,
    body: Option<String>,
    visibility: Option<String>,
) -> Result<SharedInsight, InsightError> {
    let pool = DatabaseManager::pool().await?;
    load_for_modify(&pool, tenant_id, caller_id, caller_is_admin, id).await?;

    let insight = sqlx::query_as::<_, SharedInsight>(
        "UPDATE shared_insights
         SET title = COALESCE($3, title),
             body = COALESCE($4, body),
             visibility = COALESCE($5, visibility),
             updated_at = now()
         WHERE id = $1 AND tenant_id = $2
         RETURNING *",
    )
    .bind(id)
    .bind(tenant_id)
    .bind(title)
    .bind(body)
    .bind(visibility)
    .fetch_one(&pool)
    .await?;

    audit_service::record(
        tenant_id,
        Some(caller_id),
        "insight.update",
        "insight",
        Some(id),
        json!({ "visibility": insight.visibility }),
    );

    Ok(insight)
}

/// Trash the insight and return its quota unit
pub async fn delete(
    tenant_id: Uuid,
    caller_id: Uuid,
    caller_is_admin: bool,
    id: Uuid,
) -> Result<(), InsightError> {
    let pool = DatabaseManager::pool().await?;
    load_for_modify(&pool, tenant_id, caller_id, caller_is_admin, id).await?;

    let mut tx = pool.begin().await?;
    sqlx::query(
        "UPDATE shared_insights SET trashed_at = now(), updated_at = now()
         WHERE id = $1 AND tenant_id = $2 AND trashed_at IS NULL",
    )
    .bind(id)
    .bind(tenant_id)
    .execute(&mut *tx)
    .await?;
    quota_service::release(&mut *tx, tenant_id, RESOURCE_INSIGHTS).await?;
    tx.commit().await?;

    audit_service::record(
        tenant_id,
        Some(caller_id),
        "insight.delete",
        "insight",
        Some(id),
        serde_json::Value::Null,
    );
    Ok(())
}
