use axum::extract::Query;
use axum::Extension;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::audit_log::AuditLog;
use crate::database::page::{PageParams, PageResponse};
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::audit_service::{self, AuditFilters};

const AUDIT_SORT_COLUMNS: &[&str] = &["created_at"];

#[derive(Debug, Deserialize)]
pub struct AuditListQuery {
    pub tenant_id: Option<Uuid>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub actor_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order: Option<String>,
}

/// GET /api/v1/admin/audit
pub async fn list(
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<AuditListQuery>,
) -> ApiResult<PageResponse<AuditLog>> {
    auth_user.require_admin()?;
    let tenant_id = auth_user.scope_tenant(query.tenant_id)?;

    let filters = AuditFilters {
        action: query.action,
        resource_type: query.resource_type,
        actor_id: query.actor_id,
        from: query.from,
        to: query.to,
    };
    let page = PageParams {
        limit: query.limit,
        offset: query.offset,
        order: query.order,
    }
    .resolve(AUDIT_SORT_COLUMNS);
    let result = audit_service::list(tenant_id, &filters, &page).await?;
    Ok(ApiResponse::success(result))
}
