use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::audit_log::AuditLog;
use crate::database::page::{Page, PageResponse};

#[derive(Debug, Default)]
pub struct AuditFilters {
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub actor_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Write an audit row off the request path. Failures are logged, never
/// surfaced; a lost audit row must not fail the mutation it describes.
pub fn record(
    tenant_id: Uuid,
    actor_id: Option<Uuid>,
    action: &str,
    resource_type: &str,
    resource_id: Option<Uuid>,
    detail: Value,
) {
    let action = action.to_string();
    let resource_type = resource_type.to_string();
    tokio::spawn(async move {
        let pool = match DatabaseManager::pool().await {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!("Audit write skipped, no database: {}", e);
                return;
            }
        };
        let result = sqlx::query(
            "INSERT INTO audit_logs (tenant_id, actor_id, action, resource_type, resource_id, detail)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(tenant_id)
        .bind(actor_id)
        .bind(&action)
        .bind(&resource_type)
        .bind(resource_id)
        .bind(&detail)
        .execute(&pool)
        .await;
        if let Err(e) = result {
            tracing::warn!("Audit write failed for {}: {}", action, e);
        }
    });
}

pub async fn list(
    tenant_id: Uuid,
    filters: &AuditFilters,
    page: &Page,
) -> Result<PageResponse<AuditLog>, DatabaseError> {
    let pool = DatabaseManager::pool().await?;

    let mut conditions = String::from("tenant_id = $1");
    let mut next_param = 2;
    if filters.action.is_some() {
        conditions.push_str(&format!(" AND action = ${}", next_param));
        next_param += 1;
    }
    if filters.resource_type.is_some() {
        conditions.push_str(&format!(" AND resource_type = ${}", next_param));
        next_param += 1;
    }
    if filters.actor_id.is_some() {
        conditions.push_str(&format!(" AND actor_id = ${}", next_param));
        next_param += 1;
    }
    if filters.from.is_some() {
        conditions.push_str(&format!(" AND created_at >= ${}", next_param));
        next_param += 1;
    }
    if filters.to.is_some() {
        conditions.push_str(&format!(" AND created_at <= ${}", next_param));
        next_param += 1;
    }

    macro_rules! bind_filters {
        ($query:expr) => {{
            let mut q = $query.bind(tenant_id);
            if let Some(action) = &filters.action {
                q = q.bind(action);
            }
            if let Some(resource_type) = &filters.resource_type {
                q = q.bind(resource_type);
            }
            if let Some(actor_id) = filters.actor_id {
                q = q.bind(actor_id);
            }
            if let Some(from) = filters.from {
                q = q.bind(from);
            }
            if let Some(to) = filters.to {
                q = q.bind(to);
            }
            q
        }};
    }

    let count_sql = format!("SELECT COUNT(*) FROM audit_logs WHERE {}", conditions);
    let (total,): (i64,) = bind_filters!(sqlx::query_as(&count_sql))
        .fetch_one(&pool)
        .await?;

    let list_sql = format!(
        "SELECT * FROM audit_logs WHERE {} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
        conditions,
        next_param,
        next_param + 1
    );
    let items = bind_filters!(sqlx::query_as::<_, AuditLog>(&list_sql))
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
