use axum::extract::Query;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::database::models::user::{User, ROLES, ROLE_MEMBER, ROLE_ROOT};
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::{audit_service, auth_service};

use super::TenantScopeQuery;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// POST /api/v1/admin/users
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Query(scope): Query<TenantScopeQuery>,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<User> {
    auth_user.require_admin()?;
    let tenant_id = auth_user.scope_tenant(scope.tenant_id)?;

    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|s| s.contains('@'))
        .ok_or_else(|| ApiError::validation_error("A valid email is required", None))?;
    let password = payload
        .password
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("password"))?;
    let role = payload.role.as_deref().unwrap_or(ROLE_MEMBER);
    if !ROLES.contains(&role) {
        return Err(ApiError::unprocessable_entity(format!(
            "Unknown role: {}",
            role
        )));
    }
    // Only a global admin can mint another global admin
    if role == ROLE_ROOT {
        auth_user.require_root()?;
    }
    let display_name = payload.display_name.as_deref().unwrap_or(email);

    let user = auth_service::create_user(tenant_id, email, display_name, password, role).await?;

    audit_service::record(
        tenant_id,
        Some(auth_user.user_id),
        "user.create",
        "user",
        Some(user.id),
        json!({ "email": user.email, "role": user.role }),
    );
    Ok(ApiResponse::created(user))
}
