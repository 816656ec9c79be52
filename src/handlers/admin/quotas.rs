use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::database::models::quota::Quota;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::{audit_service, quota_service};

use super::TenantScopeQuery;

#[derive(Debug, Deserialize)]
pub struct SetQuotaRequest {
    pub limit_value: Option<i64>,
}

/// PUT /api/v1/admin/quotas/:resource - lowering below current usage is
/// allowed and only blocks further creates
pub async fn set_limit(
    Extension(auth_user): Extension<AuthUser>,
    Path(resource): Path<String>,
    Query(scope): Query<TenantScopeQuery>,
    Json(payload): Json<SetQuotaRequest>,
) -> ApiResult<Quota> {
    auth_user.require_admin()?;
    let tenant_id = auth_user.scope_tenant(scope.tenant_id)?;

    let limit_value = payload
        .limit_value
        .ok_or_else(|| ApiError::missing_field("limit_value"))?;
    if limit_value < 0 {
        return Err(ApiError::validation_error(
            "limit_value cannot be negative",
            None,
        ));
    }

    let quota = quota_service::set_limit(tenant_id, &resource, limit_value).await?;

    audit_service::record(
        tenant_id,
        Some(auth_user.user_id),
        "quota.set",
        "quota",
        None,
        json!({ "resource": resource, "limit_value": limit_value }),
    );
    Ok(ApiResponse::success(quota))
}
