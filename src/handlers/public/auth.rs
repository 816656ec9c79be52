use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::database::models::user::User;
use crate::error::ApiError;
use crate::middleware::rate_limit::login_limiter;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::auth_service::{self, LoginOutcome, TokenBundle};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub tenant: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LoginResponse {
    MfaRequired {
        mfa_required: bool,
        mfa_token: String,
    },
    LoggedIn(TokenPayload),
}

#[derive(Debug, Serialize)]
pub struct TokenPayload {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

impl From<TokenBundle> for TokenPayload {
    fn from(bundle: TokenBundle) -> Self {
        Self {
            access_token: bundle.access_token,
            refresh_token: bundle.refresh_token,
            token_type: bundle.token_type,
            expires_in: bundle.expires_in,
            user: bundle.user,
        }
    }
}

fn user_agent_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// POST /api/v1/auth/login
pub async fn login(
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let tenant = payload
        .tenant
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::missing_field("tenant"))?;
    let email = payload
        .email
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::missing_field("email"))?;
    let password = payload
        .password
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("password"))?;

    // Throttle per tenant+email so one account can't be sprayed
    let rate_key = format!("{}:{}", tenant, email);
    if !login_limiter().check(&rate_key) {
        return Err(ApiError::too_many_requests(
            "Too many login attempts, try again later",
        ));
    }

    let outcome = auth_service::login(tenant, email, password, user_agent_of(&headers)).await?;
    let response = match outcome {
        LoginOutcome::MfaRequired { mfa_token } => LoginResponse::MfaRequired {
            mfa_required: true,
            mfa_token,
        },
        LoginOutcome::LoggedIn(bundle) => LoginResponse::LoggedIn((*bundle).into()),
    };
    Ok(ApiResponse::success(response))
}

#[derive(Debug, Deserialize)]
pub struct MfaVerifyRequest {
    pub mfa_token: Option<String>,
    pub code: Option<String>,
}

/// POST /api/v1/auth/mfa/verify
pub async fn mfa_verify(
    headers: HeaderMap,
    Json(payload): Json<MfaVerifyRequest>,
) -> ApiResult<TokenPayload> {
    let mfa_token = payload
        .mfa_token
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("mfa_token"))?;
    let code = payload
        .code
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("code"))?;

    let bundle = auth_service::verify_mfa(mfa_token, code, user_agent_of(&headers)).await?;
    Ok(ApiResponse::success(bundle.into()))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// POST /api/v1/auth/refresh
pub async fn refresh(Json(payload): Json<RefreshRequest>) -> ApiResult<TokenPayload> {
    let refresh_token = payload
        .refresh_token
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("refresh_token"))?;

    let bundle = auth_service::refresh(refresh_token).await?;
    Ok(ApiResponse::success(bundle.into()))
}
