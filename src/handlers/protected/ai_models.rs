use axum::Extension;

use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::ai_model_service::{self, EffectiveModel};

/// GET /api/v1/ai/models - effective configuration for the caller's
/// tenant (overrides merged over platform defaults)
pub async fn list(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Vec<EffectiveModel>> {
    let models = ai_model_service::effective_for_tenant(auth_user.tenant_id).await?;
    Ok(ApiResponse::success(models))
}
