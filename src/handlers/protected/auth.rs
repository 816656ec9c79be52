use axum::extract::Path;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::session::Session;
use crate::database::models::tenant::Tenant;
use crate::database::models::user::User;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::{auth_service, onboarding_service, tenant_service};

#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub user: User,
    pub tenant: Tenant,
}

/// GET /api/v1/auth/whoami - fresh profile for the current token
pub async fn whoami(Extension(auth_user): Extension<AuthUser>) -> ApiResult<WhoamiResponse> {
    let user = auth_service::get_user(auth_user.user_id).await?;
    let tenant = tenant_service::get(auth_user.tenant_id).await?;
    Ok(ApiResponse::success(WhoamiResponse { user, tenant }))
}

/// DELETE /api/v1/auth/session - revoke the session behind this token
pub async fn logout(Extension(auth_user): Extension<AuthUser>) -> ApiResult<()> {
    let session_id = auth_user
        .session_id
        .ok_or_else(|| ApiError::bad_request("Token has no session to revoke"))?;
    auth_service::revoke_session(auth_user.user_id, session_id).await?;
    Ok(ApiResponse::<()>::no_content())
}

/// GET /api/v1/sessions - the caller's active sessions, newest first
pub async fn sessions_list(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Vec<Session>> {
    let sessions = auth_service::sessions_for_user(auth_user.user_id).await?;
    Ok(ApiResponse::success(sessions))
}

/// DELETE /api/v1/sessions/:id
pub async fn session_revoke(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    auth_service::revoke_session(auth_user.user_id, id).await?;
    Ok(ApiResponse::<()>::no_content())
}

#[derive(Debug, Serialize)]
pub struct MfaEnrollResponse {
    pub secret: String,
    pub otpauth_url: String,
}

/// POST /api/v1/auth/mfa/enroll
pub async fn mfa_enroll(Extension(auth_user): Extension<AuthUser>) -> ApiResult<MfaEnrollResponse> {
    let (secret, otpauth_url) = auth_service::mfa_enroll(auth_user.user_id).await?;
    Ok(ApiResponse::success(MfaEnrollResponse {
        secret,
        otpauth_url,
    }))
}

#[derive(Debug, Deserialize)]
pub struct MfaCodeRequest {
    pub code: Option<String>,
}

/// POST /api/v1/auth/mfa/activate
pub async fn mfa_activate(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<MfaCodeRequest>,
) -> ApiResult<()> {
    let code = payload
        .code
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("code"))?;
    auth_service::mfa_activate(auth_user.user_id, code).await?;
    onboarding_service::mark_step(auth_user.user_id, auth_user.tenant_id, "mfa_enabled");
    Ok(ApiResponse::<()>::no_content())
}

/// DELETE /api/v1/auth/mfa - a current code is required to disable
pub async fn mfa_disable(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<MfaCodeRequest>,
) -> ApiResult<()> {
    let code = payload
        .code
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("code"))?;
    auth_service::mfa_disable(auth_user.user_id, code).await?;
    Ok(ApiResponse::<()>::no_content())
}
