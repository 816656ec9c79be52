use axum::Json;
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::oauth_service::{self, TokenResponse};

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// POST /api/v1/oauth/token - client_credentials grant
pub async fn token(Json(payload): Json<TokenRequest>) -> ApiResult<TokenResponse> {
    let grant_type = payload
        .grant_type
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("grant_type"))?;
    let client_id = payload
        .client_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("client_id"))?;
    let client_secret = payload
        .client_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("client_secret"))?;

    let response = oauth_service::token(grant_type, client_id, client_secret).await?;
    Ok(ApiResponse::success(response))
}
