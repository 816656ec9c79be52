use axum::Extension;

use crate::database::models::quota::Quota;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::quota_service;

/// GET /api/v1/quotas - the caller tenant's quotas
pub async fn list(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Vec<Quota>> {
    let quotas = quota_service::list(auth_user.tenant_id).await?;
    Ok(ApiResponse::success(quotas))
}
