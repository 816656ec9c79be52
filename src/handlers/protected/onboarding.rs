use axum::{Extension, Json};
use serde::Deserialize;

use crate::database::models::onboarding::OnboardingProgress;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::onboarding_service;

/// GET /api/v1/onboarding - lazily created on first read
pub async fn get(Extension(auth_user): Extension<AuthUser>) -> ApiResult<OnboardingProgress> {
    let progress =
        onboarding_service::get_or_create(auth_user.user_id, auth_user.tenant_id).await?;
    Ok(ApiResponse::success(progress))
}

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub step: Option<String>,
    pub done: Option<bool>,
}

/// PATCH /api/v1/onboarding
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<StepRequest>,
) -> ApiResult<OnboardingProgress> {
    let step = payload
        .step
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("step"))?;
    let done = payload.done.unwrap_or(true);

    let progress =
        onboarding_service::set_step(auth_user.user_id, auth_user.tenant_id, step, done).await?;
    Ok(ApiResponse::success(progress))
}
