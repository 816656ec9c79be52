// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 422 Unprocessable Entity (well-formed JSON, semantically invalid)
    UnprocessableEntity(String),

    // 429 Too Many Requests (rate limits and quota exhaustion)
    TooManyRequests(String),
    QuotaExceeded(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::UnprocessableEntity(_) => 422,
            ApiError::TooManyRequests(_) => 429,
            ApiError::QuotaExceeded(_) => 429,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::UnprocessableEntity(msg) => msg,
            ApiError::TooManyRequests(msg) => msg,
            ApiError::QuotaExceeded(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::UnprocessableEntity(_) => "UNPROCESSABLE_ENTITY",
            ApiError::TooManyRequests(_) => "TOO_MANY_REQUESTS",
            ApiError::QuotaExceeded(_) => "QUOTA_EXCEEDED",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError {
                message,
                field_errors,
            } => {
                let mut response = json!({
                    "error": true,
                    "message": message,
                    "code": "VALIDATION_ERROR"
                });
                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }
                response
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn missing_field(field: &str) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), "This field is required".to_string());
        ApiError::ValidationError {
            message: format!("Missing required field: {}", field),
            field_errors: Some(field_errors),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        ApiError::UnprocessableEntity(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        ApiError::TooManyRequests(message.into())
    }

    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        ApiError::QuotaExceeded(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert infrastructure and service errors to ApiError

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::not_found("Record not found"),
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                tracing::error!("Database unavailable: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            other => {
                // Never expose internal SQL errors to clients
                tracing::error!("SQLx error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        use crate::database::manager::DatabaseError;
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database configuration error: {}", err);
                ApiError::service_unavailable("Database not configured")
            }
            DatabaseError::Sqlx(sqlx_err) => sqlx_err.into(),
        }
    }
}

impl From<crate::services::auth_service::AuthError> for ApiError {
    fn from(err: crate::services::auth_service::AuthError) -> Self {
        use crate::services::auth_service::AuthError;
        match err {
            // Unknown user and bad password must be indistinguishable
            AuthError::InvalidCredentials => ApiError::unauthorized("Invalid credentials"),
            AuthError::AccountDisabled => ApiError::forbidden("Account is disabled"),
            AuthError::TenantInactive => ApiError::forbidden("Tenant is inactive"),
            AuthError::InvalidToken(msg) => ApiError::unauthorized(msg),
            AuthError::SessionNotFound => ApiError::not_found("Session not found"),
            AuthError::MfaCodeInvalid => ApiError::unauthorized("Invalid MFA code"),
            AuthError::MfaAlreadyEnabled => ApiError::conflict("MFA is already enabled"),
            AuthError::MfaNotEnrolled => ApiError::conflict("MFA enrollment has not started"),
            AuthError::WeakPassword(msg) => ApiError::validation_error(msg, None),
            AuthError::EmailTaken => ApiError::conflict("Email is already registered"),
            AuthError::Internal(msg) => {
                tracing::error!("Auth internal error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            AuthError::Database(db) => db.into(),
        }
    }
}

impl From<crate::services::tenant_service::TenantError> for ApiError {
    fn from(err: crate::services::tenant_service::TenantError) -> Self {
        use crate::services::tenant_service::TenantError;
        match err {
            TenantError::AlreadyExists(name) => {
                ApiError::conflict(format!("Tenant already exists: {}", name))
            }
            TenantError::InvalidName(msg) => ApiError::validation_error(msg, None),
            TenantError::NotFound => ApiError::not_found("Tenant not found"),
            TenantError::Database(db) => db.into(),
        }
    }
}

impl From<crate::services::quota_service::QuotaError> for ApiError {
    fn from(err: crate::services::quota_service::QuotaError) -> Self {
        use crate::services::quota_service::QuotaError;
        match err {
            QuotaError::Exceeded { resource } => {
                ApiError::quota_exceeded(format!("Quota exceeded for {}", resource))
            }
            QuotaError::UnknownResource(name) => {
                ApiError::unprocessable_entity(format!("Unknown quota resource: {}", name))
            }
            QuotaError::Database(db) => db.into(),
        }
    }
}

impl From<crate::services::shard_service::ShardError> for ApiError {
    fn from(err: crate::services::shard_service::ShardError) -> Self {
        use crate::services::shard_service::ShardError;
        match err {
            ShardError::NotFound => ApiError::not_found("Shard not found"),
            ShardError::NotTrashed => ApiError::not_found("Shard is not trashed"),
            ShardError::RevisionNotFound(n) => {
                ApiError::not_found(format!("Revision {} not found", n))
            }
            ShardError::RevisionConflict { expected, actual } => ApiError::conflict(format!(
                "Revision conflict: expected {}, shard is at {}",
                expected, actual
            )),
            ShardError::Quota(q) => q.into(),
            ShardError::Database(db) => db.into(),
        }
    }
}

impl From<crate::services::insight_service::InsightError> for ApiError {
    fn from(err: crate::services::insight_service::InsightError) -> Self {
        use crate::services::insight_service::InsightError;
        match err {
            InsightError::NotFound => ApiError::not_found("Insight not found"),
            InsightError::NotAuthor => {
                ApiError::forbidden("Only the author or a tenant admin may modify this insight")
            }
            InsightError::Quota(q) => q.into(),
            InsightError::Database(db) => db.into(),
        }
    }
}

impl From<crate::services::oauth_service::OAuthError> for ApiError {
    fn from(err: crate::services::oauth_service::OAuthError) -> Self {
        use crate::services::oauth_service::OAuthError;
        match err {
            OAuthError::UnsupportedGrantType(g) => {
                ApiError::bad_request(format!("unsupported_grant_type: {}", g))
            }
            OAuthError::InvalidClient => ApiError::unauthorized("invalid_client"),
            OAuthError::NotFound => ApiError::not_found("OAuth2 client not found"),
            OAuthError::Quota(q) => q.into(),
            OAuthError::Internal(msg) => {
                tracing::error!("OAuth internal error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            OAuthError::Database(db) => db.into(),
        }
    }
}

impl From<crate::services::webhook_service::WebhookError> for ApiError {
    fn from(err: crate::services::webhook_service::WebhookError) -> Self {
        use crate::services::webhook_service::WebhookError;
        match err {
            WebhookError::InvalidUrl(msg) => ApiError::validation_error(msg, None),
            WebhookError::UnknownEvent(ev) => {
                ApiError::unprocessable_entity(format!("Unknown webhook event: {}", ev))
            }
            WebhookError::NoEvents => {
                ApiError::validation_error("At least one event must be subscribed", None)
            }
            WebhookError::NotFound => ApiError::not_found("Webhook not found"),
            WebhookError::Database(db) => db.into(),
        }
    }
}

impl From<crate::services::ai_model_service::AiModelError> for ApiError {
    fn from(err: crate::services::ai_model_service::AiModelError) -> Self {
        use crate::services::ai_model_service::AiModelError;
        match err {
            AiModelError::UnknownKind(kind) => {
                ApiError::unprocessable_entity(format!("Unknown model kind: {}", kind))
            }
            AiModelError::NotFound => ApiError::not_found("Model configuration not found"),
            AiModelError::Database(db) => db.into(),
        }
    }
}

impl From<crate::services::onboarding_service::OnboardingError> for ApiError {
    fn from(err: crate::services::onboarding_service::OnboardingError) -> Self {
        use crate::services::onboarding_service::OnboardingError;
        match err {
            OnboardingError::UnknownStep(step) => {
                ApiError::unprocessable_entity(format!("Unknown onboarding step: {}", step))
            }
            OnboardingError::Database(db) => db.into(),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_variants() {
        assert_eq!(ApiError::bad_request("x").status_code(), 400);
        assert_eq!(ApiError::unauthorized("x").status_code(), 401);
        assert_eq!(ApiError::forbidden("x").status_code(), 403);
        assert_eq!(ApiError::not_found("x").status_code(), 404);
        assert_eq!(ApiError::conflict("x").status_code(), 409);
        assert_eq!(ApiError::unprocessable_entity("x").status_code(), 422);
        assert_eq!(ApiError::quota_exceeded("x").status_code(), 429);
        assert_eq!(ApiError::service_unavailable("x").status_code(), 503);
    }

    #[test]
    fn validation_error_carries_field_errors() {
        let err = ApiError::missing_field("name");
        let body = err.to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["field_errors"]["name"], "This field is required");
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), 404);
    }
}
