use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::webhook::Webhook;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::webhook_service;

use super::TenantScopeQuery;

/// GET /api/v1/admin/webhooks
pub async fn list(
    Extension(auth_user): Extension<AuthUser>,
    Query(scope): Query<TenantScopeQuery>,
) -> ApiResult<Vec<Webhook>> {
    auth_user.require_admin()?;
    let tenant_id = auth_user.scope_tenant(scope.tenant_id)?;
    let webhooks = webhook_service::list(tenant_id).await?;
    Ok(ApiResponse::success(webhooks))
}

#[derive(Debug, Deserialize)]
pub struct CreateWebhookRequest {
    pub url: Option<String>,
    pub events: Option<Vec<String>>,
}

/// The signing secret appears in this response only
#[derive(Debug, Serialize)]
pub struct CreatedWebhookResponse {
    #[serde(flatten)]
    pub webhook: Webhook,
    pub secret: String,
}

/// POST /api/v1/admin/webhooks
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Query(scope): Query<TenantScopeQuery>,
    Json(payload): Json<CreateWebhookRequest>,
) -> ApiResult<CreatedWebhookResponse> {
    auth_user.require_admin()?;
    let tenant_id = auth_user.scope_tenant(scope.tenant_id)?;

    let url = payload
        .url
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("url"))?;
    let events = payload.events.unwrap_or_default();

    let (webhook, secret) = webhook_service::create(tenant_id, url, events).await?;
    Ok(ApiResponse::created(CreatedWebhookResponse {
        webhook,
        secret,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateWebhookRequest {
    pub url: Option<String>,
    pub events: Option<Vec<String>>,
    pub active: Option<bool>,
}

/// PATCH /api/v1/admin/webhooks/:id - re-enabling resets failure_count
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(scope): Query<TenantScopeQuery>,
    Json(payload): Json<UpdateWebhookRequest>,
) -> ApiResult<Webhook> {
    auth_user.require_admin()?;
    let tenant_id = auth_user.scope_tenant(scope.tenant_id)?;

    if payload.url.is_none() && payload.events.is_none() && payload.active.is_none() {
        return Err(ApiError::bad_request("Nothing to update"));
    }

    let webhook =
        webhook_service::update(tenant_id, id, payload.url, payload.events, payload.active)
            .await?;
    Ok(ApiResponse::success(webhook))
}

/// DELETE /api/v1/admin/webhooks/:id
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(scope): Query<TenantScopeQuery>,
) -> ApiResult<()> {
    auth_user.require_admin()?;
    let tenant_id = auth_user.scope_tenant(scope.tenant_id)?;
    webhook_service::delete(tenant_id, id).await?;
    Ok(ApiResponse::<()>::no_content())
}
