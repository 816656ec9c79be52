use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::database::models::revision::Revision;
use crate::database::models::shard::Shard;
use crate::database::page::{PageParams, PageResponse};
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::onboarding_service;
use crate::services::shard_service::{self, ShardFilters, ShardPatch};

const SHARD_SORT_COLUMNS: &[&str] = &["created_at", "updated_at", "name"];
const REVISION_SORT_COLUMNS: &[&str] = &["revision_number", "created_at"];

#[derive(Debug, Deserialize)]
pub struct ShardListQuery {
    pub kind: Option<String>,
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order: Option<String>,
}

/// GET /api/v1/shards
pub async fn list(
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ShardListQuery>,
) -> ApiResult<PageResponse<Shard>> {
    let filters = ShardFilters {
        kind: query.kind,
        q: query.q,
    };
    let page = PageParams {
        limit: query.limit,
        offset: query.offset,
        order: query.order,
    }
    .resolve(SHARD_SORT_COLUMNS);
    let result = shard_service::list(auth_user.tenant_id, &filters, &page).await?;
    Ok(ApiResponse::success(result))
}

#[derive(Debug, Deserialize)]
pub struct CreateShardRequest {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub data: Option<serde_json::Value>,
}

/// POST /api/v1/shards
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateShardRequest>,
) -> ApiResult<Shard> {
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("name"))?;

    let data = payload.data.unwrap_or_else(|| json!({}));
    shard_service::validate_payload(&data).map_err(|msg| ApiError::validation_error(msg, None))?;

    let shard = shard_service::create(
        auth_user.tenant_id,
        auth_user.user_id,
        name,
        payload.kind,
        data,
    )
    .await?;

    onboarding_service::mark_step(auth_user.user_id, auth_user.tenant_id, "first_shard_created");
    Ok(ApiResponse::created(shard))
}

/// GET /api/v1/shards/:id
pub async fn get(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Shard> {
    let shard = shard_service::get(auth_user.tenant_id, id).await?;
    Ok(ApiResponse::success(shard))
}

#[derive(Debug, Deserialize)]
pub struct UpdateShardRequest {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub data: Option<serde_json::Value>,
    pub expected_revision: Option<i32>,
}

/// PATCH /api/v1/shards/:id
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateShardRequest>,
) -> ApiResult<Shard> {
    if payload.name.is_none() && payload.kind.is_none() && payload.data.is_none() {
        return Err(ApiError::bad_request("Nothing to update"));
    }
    if let Some(name) = &payload.name {
        if name.trim().is_empty() {
            return Err(ApiError::validation_error("name cannot be empty", None));
        }
    }
    if let Some(data) = &payload.data {
        shard_service::validate_payload(data)
            .map_err(|msg| ApiError::validation_error(msg, None))?;
    }

    let patch = ShardPatch {
        name: payload.name,
        kind: payload.kind,
        data: payload.data,
        expected_revision: payload.expected_revision,
    };
    let shard = shard_service::update(auth_user.tenant_id, auth_user.user_id, id, patch).await?;
    Ok(ApiResponse::success(shard))
}

#[derive(Debug, Deserialize)]
pub struct DeleteShardQuery {
    pub permanent: Option<bool>,
}

/// DELETE /api/v1/shards/:id - soft by default, ?permanent=true for
/// admins
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteShardQuery>,
) -> ApiResult<()> {
    if query.permanent.unwrap_or(false) {
        auth_user.require_admin()?;
        shard_service::delete_permanent(auth_user.tenant_id, auth_user.user_id, id).await?;
    } else {
        shard_service::trash(auth_user.tenant_id, auth_user.user_id, id).await?;
    }
    Ok(ApiResponse::<()>::no_content())
}

/// POST /api/v1/shards/:id/restore
pub async fn restore(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Shard> {
    let shard = shard_service::restore(auth_user.tenant_id, auth_user.user_id, id).await?;
    Ok(ApiResponse::success(shard))
}

#[derive(Debug, Deserialize)]
pub struct RevisionListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order: Option<String>,
}

/// GET /api/v1/shards/:id/revisions
pub async fn revisions(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<RevisionListQuery>,
) -> ApiResult<PageResponse<Revision>> {
    let page = PageParams {
        limit: query.limit,
        offset: query.offset,
        order: query.order,
    }
    .resolve(REVISION_SORT_COLUMNS);
    let result = shard_service::revisions(auth_user.tenant_id, id, &page).await?;
    Ok(ApiResponse::success(result))
}

/// GET /api/v1/shards/:id/revisions/:number
pub async fn revision(
    Extension(auth_user): Extension<AuthUser>,
    Path((id, number)): Path<(Uuid, i32)>,
) -> ApiResult<Revision> {
    let revision = shard_service::revision(auth_user.tenant_id, id, number).await?;
    Ok(ApiResponse::success(revision))
}

#[derive(Debug, Deserialize)]
pub struct RevertRequest {
    pub revision_number: Option<i32>,
    pub expected_revision: Option<i32>,
}

/// POST /api/v1/shards/:id/revert
pub async fn revert(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RevertRequest>,
) -> ApiResult<Shard> {
    let target = payload
        .revision_number
        .ok_or_else(|| ApiError::missing_field("revision_number"))?;
    if target < 1 {
        return Err(ApiError::validation_error(
            "revision_number must be positive",
            None,
        ));
    }

    let shard = shard_service::revert(
        auth_user.tenant_id,
        auth_user.user_id,
        id,
        target,
        payload.expected_revision,
    )
    .await?;
    Ok(ApiResponse::success(shard))
}
