use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{self, Claims};
use crate::database::models::user::{ROLE_ADMIN, ROLE_ROOT};
use crate::error::ApiError;

/// Authenticated caller context extracted from the access token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub role: String,
    pub session_id: Option<Uuid>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            tenant_id: claims.tenant_id,
            email: claims.email,
            role: claims.role,
            session_id: claims.sid,
        }
    }
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN || self.role == ROLE_ROOT
    }

    pub fn is_root(&self) -> bool {
        self.role == ROLE_ROOT
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Tenant admin role required"))
        }
    }

    pub fn require_root(&self) -> Result<(), ApiError> {
        if self.is_root() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Global admin role required"))
        }
    }

    /// Tenant the request operates on. A `tenant_id` override is honored
    /// for global admins only; everyone else is pinned to their own
    /// tenant.
    pub fn scope_tenant(&self, override_tenant: Option<Uuid>) -> Result<Uuid, ApiError> {
        match override_tenant {
            Some(other) if other != self.tenant_id => {
                self.require_root()?;
                Ok(other)
            }
            _ => Ok(self.tenant_id),
        }
    }
}

/// JWT authentication middleware that validates access tokens and injects
/// the caller context into request extensions
pub async fn jwt_auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers)?;

    let claims = auth::validate_jwt(&token, auth::SCOPE_ACCESS)
        .map_err(|e| ApiError::unauthorized(e.to_string()))?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

/// Extract the bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err(ApiError::unauthorized("Empty bearer token")),
        None => Err(ApiError::unauthorized(
            "Authorization header must use Bearer token format",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            email: "dev@atlas.test".to_string(),
            role: role.to_string(),
            session_id: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn role_checks() {
        assert!(user("admin").is_admin());
        assert!(!user("admin").is_root());
        assert!(user("root").is_admin());
        assert!(user("member").require_admin().is_err());
        assert!(user("root").require_root().is_ok());
    }

    #[test]
    fn tenant_override_requires_root() {
        let member = user("member");
        let other = Uuid::new_v4();
        assert!(member.scope_tenant(Some(other)).is_err());
        assert_eq!(member.scope_tenant(None).unwrap(), member.tenant_id);
        // Passing your own tenant id explicitly is a no-op, not an escalation
        assert_eq!(
            member.scope_tenant(Some(member.tenant_id)).unwrap(),
            member.tenant_id
        );

        let root = user("root");
        assert_eq!(root.scope_tenant(Some(other)).unwrap(), other);
    }

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("authorization", "Token abc".parse().unwrap());
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("authorization", "Bearer  ".parse().unwrap());
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("authorization", "Bearer abc123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc123");
    }
}
