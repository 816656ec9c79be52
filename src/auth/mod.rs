use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config;

pub mod password;
pub mod totp;

/// Token scopes. Access tokens open the protected API; mfa tokens are the
/// short-lived step-up credential issued between password check and TOTP
/// verification. Refresh tokens are opaque random strings (not JWTs) and
/// live hashed in the sessions table.
pub const SCOPE_ACCESS: &str = "access";
pub const SCOPE_MFA: &str = "mfa";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub role: String,
    pub scope: String,
    /// Session backing this token; None for service (client_credentials)
    /// and mfa tokens
    pub sid: Option<Uuid>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn access(
        sub: Uuid,
        tenant_id: Uuid,
        email: String,
        role: String,
        sid: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        let ttl = config::config().security.access_token_ttl_secs;
        Self {
            sub,
            tenant_id,
            email,
            role,
            scope: SCOPE_ACCESS.to_string(),
            sid,
            exp: (now + Duration::seconds(ttl)).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn mfa(sub: Uuid, tenant_id: Uuid, email: String, role: String) -> Self {
        let now = Utc::now();
        let ttl = config::config().security.mfa_token_ttl_secs;
        Self {
            sub,
            tenant_id,
            email,
            role,
            scope: SCOPE_MFA.to_string(),
            sid: None,
            exp: (now + Duration::seconds(ttl)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    MissingSecret,
    #[error("Token generation failed: {0}")]
    TokenGeneration(String),
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Token has wrong scope: expected {expected}, got {actual}")]
    WrongScope { expected: String, actual: String },
}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Validate a token and enforce its scope. Expired or tampered tokens and
/// scope mismatches (e.g. an mfa token used against the protected API)
/// all fail here.
pub fn validate_jwt(token: &str, expected_scope: &str) -> Result<Claims, JwtError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

    let claims = token_data.claims;
    if claims.scope != expected_scope {
        return Err(JwtError::WrongScope {
            expected: expected_scope.to_string(),
            actual: claims.scope,
        });
    }
    Ok(claims)
}

/// Opaque random token for refresh flows and client secrets (43 chars of
/// URL-safe base64).
pub fn generate_opaque_token() -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use rand::RngCore;

    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// sha256 hex digest used to store refresh tokens and client secrets
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> Claims {
        Claims::access(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "dev@atlas.test".to_string(),
            "member".to_string(),
            Some(Uuid::new_v4()),
        )
    }

    #[test]
    fn access_token_round_trips() {
        let claims = claims();
        let token = generate_jwt(&claims).unwrap();
        let decoded = validate_jwt(&token, SCOPE_ACCESS).unwrap();
        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.tenant_id, claims.tenant_id);
        assert_eq!(decoded.sid, claims.sid);
        assert_eq!(decoded.role, "member");
    }

    #[test]
    fn mfa_token_rejected_as_access_token() {
        let c = claims();
        let mfa = Claims::mfa(c.sub, c.tenant_id, c.email, c.role);
        let token = generate_jwt(&mfa).unwrap();
        assert!(matches!(
            validate_jwt(&token, SCOPE_ACCESS),
            Err(JwtError::WrongScope { .. })
        ));
        assert!(validate_jwt(&token, SCOPE_MFA).is_ok());
    }

    #[test]
    fn tampered_token_rejected() {
        let token = generate_jwt(&claims()).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(validate_jwt(&tampered, SCOPE_ACCESS).is_err());
    }

    #[test]
    fn opaque_tokens_are_unique_and_digestable() {
        let a = generate_opaque_token();
        let b = generate_opaque_token();
        assert_ne!(a, b);
        assert_eq!(token_digest(&a).len(), 64);
        assert_eq!(token_digest(&a), token_digest(&a));
    }
}
