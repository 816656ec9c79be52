use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::oauth_client::OAuth2Client;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::oauth_service;

use super::TenantScopeQuery;

/// GET /api/v1/admin/oauth/clients
pub async fn list(
    Extension(auth_user): Extension<AuthUser>,
    Query(scope): Query<TenantScopeQuery>,
) -> ApiResult<Vec<OAuth2Client>> {
    auth_user.require_admin()?;
    let tenant_id = auth_user.scope_tenant(scope.tenant_id)?;
    let clients = oauth_service::list_clients(tenant_id).await?;
    Ok(ApiResponse::success(clients))
}

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: Option<String>,
    pub scopes: Option<Vec<String>>,
}

/// The only response that ever carries the plaintext secret
#[derive(Debug, Serialize)]
pub struct CreatedClientResponse {
    #[serde(flatten)]
    pub client: OAuth2Client,
    pub client_secret: String,
}

/// POST /api/v1/admin/oauth/clients
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Query(scope): Query<TenantScopeQuery>,
    Json(payload): Json<CreateClientRequest>,
) -> ApiResult<CreatedClientResponse> {
    auth_user.require_admin()?;
    let tenant_id = auth_user.scope_tenant(scope.tenant_id)?;

    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("name"))?;
    let scopes = payload.scopes.unwrap_or_default();

    let (client, client_secret) =
        oauth_service::create_client(tenant_id, auth_user.user_id, name, scopes).await?;
    Ok(ApiResponse::created(CreatedClientResponse {
        client,
        client_secret,
    }))
}

/// GET /api/v1/admin/oauth/clients/:id
pub async fn get(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(scope): Query<TenantScopeQuery>,
) -> ApiResult<OAuth2Client> {
    auth_user.require_admin()?;
    let tenant_id = auth_user.scope_tenant(scope.tenant_id)?;
    let client = oauth_service::get_client(tenant_id, id).await?;
    Ok(ApiResponse::success(client))
}

#[derive(Debug, Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub scopes: Option<Vec<String>>,
    pub active: Option<bool>,
}

/// PATCH /api/v1/admin/oauth/clients/:id
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(scope): Query<TenantScopeQuery>,
    Json(payload): Json<UpdateClientRequest>,
) -> ApiResult<OAuth2Client> {
    auth_user.require_admin()?;
    let tenant_id = auth_user.scope_tenant(scope.tenant_id)?;

    if payload.name.is_none() && payload.scopes.is_none() && payload.active.is_none() {
        return Err(ApiError::bad_request("Nothing to update"));
    }

    let client = oauth_service::update_client(
        tenant_id,
        auth_user.user_id,
        id,
        payload.name,
        payload.scopes,
        payload.active,
    )
    .await?;
    Ok(ApiResponse::success(client))
}

/// DELETE /api/v1/admin/oauth/clients/:id - permanent, releases quota
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(scope): Query<TenantScopeQuery>,
) -> ApiResult<()> {
    auth_user.require_admin()?;
    let tenant_id = auth_user.scope_tenant(scope.tenant_id)?;
    oauth_service::delete_client(tenant_id, auth_user.user_id, id).await?;
    Ok(ApiResponse::<()>::no_content())
}
