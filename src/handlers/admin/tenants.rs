use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::database::models::tenant::{Tenant, PLANS, PLAN_FREE};
use crate::database::page::{PageParams, PageResponse};
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::{audit_service, tenant_service};

const TENANT_SORT_COLUMNS: &[&str] = &["created_at", "updated_at", "name"];

fn validate_plan(plan: &str) -> Result<(), ApiError> {
    if PLANS.contains(&plan) {
        Ok(())
    } else {
        Err(ApiError::unprocessable_entity(format!(
            "Unknown plan: {}",
            plan
        )))
    }
}

#[derive(Debug, Deserialize)]
pub struct TenantListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order: Option<String>,
}

/// GET /api/v1/admin/tenants (root)
pub async fn list(
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<TenantListQuery>,
) -> ApiResult<PageResponse<Tenant>> {
    auth_user.require_root()?;
    let page = PageParams {
        limit: query.limit,
        offset: query.offset,
        order: query.order,
    }
    .resolve(TENANT_SORT_COLUMNS);
    let result = tenant_service::list(&page).await?;
    Ok(ApiResponse::success(result))
}

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub plan: Option<String>,
}

/// POST /api/v1/admin/tenants (root) - creates the tenant and seeds its
/// plan quotas
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateTenantRequest>,
) -> ApiResult<Tenant> {
    auth_user.require_root()?;

    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("name"))?;
    let plan = payload.plan.as_deref().unwrap_or(PLAN_FREE);
    validate_plan(plan)?;
    let display_name = payload.display_name.as_deref().unwrap_or(name);

    let tenant = tenant_service::create(name, display_name, plan).await?;

    audit_service::record(
        tenant.id,
        Some(auth_user.user_id),
        "tenant.create",
        "tenant",
        Some(tenant.id),
        json!({ "name": tenant.name, "plan": tenant.plan }),
    );
    Ok(ApiResponse::created(tenant))
}

/// GET /api/v1/admin/tenants/:id (root)
pub async fn get(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Tenant> {
    auth_user.require_root()?;
    let tenant = tenant_service::get(id).await?;
    Ok(ApiResponse::success(tenant))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTenantRequest {
    pub display_name: Option<String>,
    pub plan: Option<String>,
    pub active: Option<bool>,
}

/// PATCH /api/v1/admin/tenants/:id (root)
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTenantRequest>,
) -> ApiResult<Tenant> {
    auth_user.require_root()?;
    if payload.display_name.is_none() && payload.plan.is_none() && payload.active.is_none() {
        return Err(ApiError::bad_request("Nothing to update"));
    }
    if let Some(plan) = &payload.plan {
        validate_plan(plan)?;
    }

    let tenant =
        tenant_service::update(id, payload.display_name, payload.plan, payload.active).await?;

    audit_service::record(
        id,
        Some(auth_user.user_id),
        "tenant.update",
        "tenant",
        Some(id),
        json!({ "plan": tenant.plan, "active": tenant.active }),
    );
    Ok(ApiResponse::success(tenant))
}

/// DELETE /api/v1/admin/tenants/:id (root) - soft delete
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    auth_user.require_root()?;
    tenant_service::trash(id).await?;

    audit_service::record(
        id,
        Some(auth_user.user_id),
        "tenant.trash",
        "tenant",
        Some(id),
        serde_json::Value::Null,
    );
    Ok(ApiResponse::<()>::no_content())
}

/// POST /api/v1/admin/tenants/:id/restore (root)
pub async fn restore(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Tenant> {
    auth_user.require_root()?;
    let tenant = tenant_service::restore(id).await?;

    audit_service::record(
        id,
        Some(auth_user.user_id),
        "tenant.restore",
        "tenant",
        Some(id),
        serde_json::Value::Null,
    );
    Ok(ApiResponse::success(tenant))
}
