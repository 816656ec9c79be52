use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::insight::{SharedInsight, VISIBILITY_PRIVATE, VISIBILITY_TENANT};
use crate::database::page::{PageParams, PageResponse};
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::{insight_service, onboarding_service};

const INSIGHT_SORT_COLUMNS: &[&str] = &["created_at", "updated_at", "title"];

fn validate_visibility(visibility: &str) -> Result<(), ApiError> {
    if visibility == VISIBILITY_PRIVATE || visibility == VISIBILITY_TENANT {
        Ok(())
    } else {
        Err(ApiError::unprocessable_entity(format!(
            "Unknown visibility: {}",
            visibility
        )))
    }
}

#[derive(Debug, Deserialize)]
pub struct InsightListQuery {
    pub shard_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order: Option<String>,
}

/// GET /api/v1/insights
pub async fn list(
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<InsightListQuery>,
) -> ApiResult<PageResponse<SharedInsight>> {
    let page = PageParams {
        limit: query.limit,
        offset: query.offset,
        order: query.order,
    }
    .resolve(INSIGHT_SORT_COLUMNS);
    let result =
        insight_service::list(auth_user.tenant_id, auth_user.user_id, query.shard_id, &page)
            .await?;
    Ok(ApiResponse::success(result))
}

#[derive(Debug, Deserialize)]
pub struct CreateInsightRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub shard_id: Option<Uuid>,
    pub visibility: Option<String>,
}

/// POST /api/v1/insights
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateInsightRequest>,
) -> ApiResult<SharedInsight> {
    let title = payload
        .title
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("title"))?;
    let body = payload
        .body
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("body"))?;
    let visibility = payload.visibility.as_deref().unwrap_or(VISIBILITY_PRIVATE);
    validate_visibility(visibility)?;

    let insight = insight_service::create(
        auth_user.tenant_id,
        auth_user.user_id,
        title,
        body,
        payload.shard_id,
        visibility,
    )
    .await?;

    if insight.visibility == VISIBILITY_TENANT {
        onboarding_service::mark_step(
            auth_user.user_id,
            auth_user.tenant_id,
            "first_insight_shared",
        );
    }
    Ok(ApiResponse::created(insight))
}

/// GET /api/v1/insights/:id
pub async fn get(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<SharedInsight> {
    let insight = insight_service::get(auth_user.tenant_id, auth_user.user_id, id).await?;
    Ok(ApiResponse::success(insight))
}

#[derive(Debug, Deserialize)]
pub struct UpdateInsightRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub visibility: Option<String>,
}

/// PATCH /api/v1/insights/:id - flipping visibility to `tenant` is the
/// share operation
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInsightRequest>,
) -> ApiResult<SharedInsight> {
    if payload.title.is_none() && payload.body.is_none() && payload.visibility.is_none() {
        return Err(ApiError::bad_request("Nothing to update"));
    }
    if let Some(visibility) = &payload.visibility {
        validate_visibility(visibility)?;
    }

    let shared = payload.visibility.as_deref() == Some(VISIBILITY_TENANT);
    let insight = insight_service::update(
        auth_user.tenant_id,
        auth_user.user_id,
        auth_user.is_admin(),
        id,
        payload.title,
        payload.body,
        payload.visibility,
    )
    .await?;

    if shared {
        onboarding_service::mark_step(
            auth_user.user_id,
            auth_user.tenant_id,
            "first_insight_shared",
        );
    }
    Ok(ApiResponse::success(insight))
}

/// DELETE /api/v1/insights/:id
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    insight_service::delete(
        auth_user.tenant_id,
        auth_user.user_id,
        auth_user.is_admin(),
        id,
    )
    .await?;
    Ok(ApiResponse::<()>::no_content())
}
