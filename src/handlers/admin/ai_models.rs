use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::ai_model::AiModel;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::ai_model_service;

use super::TenantScopeQuery;

/// A tenant admin edits their tenant's overrides. A global admin with no
/// tenant_id override edits the platform defaults.
fn resolve_scope(auth_user: &AuthUser, query: &TenantScopeQuery) -> Result<Option<Uuid>, ApiError> {
    auth_user.require_admin()?;
    if auth_user.is_root() && query.tenant_id.is_none() {
        return Ok(None);
    }
    Ok(Some(auth_user.scope_tenant(query.tenant_id)?))
}

/// GET /api/v1/admin/ai/models - raw rows for the resolved scope
pub async fn list(
    Extension(auth_user): Extension<AuthUser>,
    Query(scope): Query<TenantScopeQuery>,
) -> ApiResult<Vec<AiModel>> {
    let tenant_scope = resolve_scope(&auth_user, &scope)?;
    let models = ai_model_service::list_scope(tenant_scope).await?;
    Ok(ApiResponse::success(models))
}

#[derive(Debug, Deserialize)]
pub struct UpsertModelRequest {
    pub endpoint_url: Option<String>,
    pub enabled: Option<bool>,
    pub params: Option<serde_json::Value>,
}

/// PUT /api/v1/admin/ai/models/:kind
pub async fn upsert(
    Extension(auth_user): Extension<AuthUser>,
    Path(kind): Path<String>,
    Query(scope): Query<TenantScopeQuery>,
    Json(payload): Json<UpsertModelRequest>,
) -> ApiResult<AiModel> {
    let tenant_scope = resolve_scope(&auth_user, &scope)?;

    if let Some(url) = &payload.endpoint_url {
        url::Url::parse(url)
            .map_err(|_| ApiError::validation_error(format!("Not a valid URL: {}", url), None))?;
    }

    let model = ai_model_service::upsert(
        tenant_scope,
        auth_user.user_id,
        &kind,
        payload.endpoint_url,
        payload.enabled,
        payload.params,
    )
    .await?;
    Ok(ApiResponse::success(model))
}

/// DELETE /api/v1/admin/ai/models/:kind - drop the override (404 when
/// none exists)
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Path(kind): Path<String>,
    Query(scope): Query<TenantScopeQuery>,
) -> ApiResult<()> {
    let tenant_scope = resolve_scope(&auth_user, &scope)?;
    ai_model_service::delete(tenant_scope, &kind).await?;
    Ok(ApiResponse::<()>::no_content())
}
