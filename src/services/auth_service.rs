use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{self, password, totp, Claims};
use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::session::Session;
use crate::database::models::user::{User, ROLES};
use crate::services::tenant_service;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Account is disabled")]
    AccountDisabled,
    #[error("Tenant is inactive")]
    TenantInactive,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Session not found")]
    SessionNotFound,
    #[error("Invalid MFA code")]
    MfaCodeInvalid,
    #[error("MFA already enabled")]
    MfaAlreadyEnabled,
    #[error("MFA enrollment has not started")]
    MfaNotEnrolled,
    #[error("{0}")]
    WeakPassword(String),
    #[error("Email is already registered")]
    EmailTaken,
    #[error("Internal auth error: {0}")]
    Internal(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Database(DatabaseError::Sqlx(err))
    }
}

impl From<auth::JwtError> for AuthError {
    fn from(err: auth::JwtError) -> Self {
        match err {
            auth::JwtError::InvalidToken(msg) => AuthError::InvalidToken(msg),
            auth::JwtError::WrongScope { .. } => {
                AuthError::InvalidToken("Token has wrong scope".to_string())
            }
            other => AuthError::Internal(other.to_string()),
        }
    }
}

/// Tokens handed to a fully authenticated caller
#[derive(Debug, Serialize)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

/// Login either completes immediately or parks at the MFA step
#[derive(Debug)]
pub enum LoginOutcome {
    LoggedIn(Box<TokenBundle>),
    MfaRequired { mfa_token: String },
}

async fn find_login_user(tenant_name: &str, email: &str) -> Result<User, AuthError> {
    let tenant = tenant_service::get_by_name(tenant_name)
        .await
        .map_err(|e| match e {
            tenant_service::TenantError::Database(db) => AuthError::Database(db),
            _ => AuthError::InvalidCredentials,
        })?
        .ok_or(AuthError::InvalidCredentials)?;
    if !tenant.active {
        return Err(AuthError::TenantInactive);
    }

    let pool = DatabaseManager::pool().await?;
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE tenant_id = $1 AND email = $2 AND deleted_at IS NULL",
    )
    .bind(tenant.id)
    .bind(email)
    .fetch_optional(&pool)
    .await?
    .ok_or(AuthError::InvalidCredentials)?;

    if user.trashed_at.is_some() {
        return Err(AuthError::AccountDisabled);
    }
    Ok(user)
}

/// Password login. Wrong tenant, unknown email and bad password are all
/// the same InvalidCredentials to the caller.
pub async fn login(
    tenant_name: &str,
    email: &str,
    passwd: &str,
    user_agent: Option<String>,
) -> Result<LoginOutcome, AuthError> {
    let user = find_login_user(tenant_name, email).await?;

    if !password::verify_password(passwd, &user.password_hash) {
        return Err(AuthError::InvalidCredentials);
    }

    if user.mfa_enabled {
        let claims = Claims::mfa(user.id, user.tenant_id, user.email.clone(), user.role.clone());
        let mfa_token = auth::generate_jwt(&claims)?;
        return Ok(LoginOutcome::MfaRequired { mfa_token });
    }

    let bundle = issue_tokens(user, user_agent).await?;
    Ok(LoginOutcome::LoggedIn(Box::new(bundle)))
}

/// Second factor: exchange an mfa-scoped token plus a TOTP code for real
/// tokens
pub async fn verify_mfa(
    mfa_token: &str,
    code: &str,
    user_agent: Option<String>,
) -> Result<TokenBundle, AuthError> {
    let claims = auth::validate_jwt(mfa_token, auth::SCOPE_MFA)?;
    let user = get_user(claims.sub).await?;

    let secret = user
        .mfa_secret
        .clone()
        .filter(|_| user.mfa_enabled)
        .ok_or(AuthError::MfaNotEnrolled)?;

    let ok = totp::verify_now(&secret, code).map_err(|_| AuthError::MfaCodeInvalid)?;
    if !ok {
        return Err(AuthError::MfaCodeInvalid);
    }

    issue_tokens(user, user_agent).await
}

/// Mint an access token, create the backing session row and stamp
/// last_login_at
async fn issue_tokens(user: User, user_agent: Option<String>) -> Result<TokenBundle, AuthError> {
    let pool = DatabaseManager::pool().await?;
    let security = &config::config().security;

    let refresh_token = auth::generate_opaque_token();
    let expires_at = Utc::now() + Duration::hours(security.refresh_token_ttl_hours);

    let session = sqlx::query_as::<_, Session>(
        "INSERT INTO sessions (user_id, tenant_id, refresh_token_hash, user_agent, expires_at)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(user.id)
    .bind(user.tenant_id)
    .bind(auth::token_digest(&refresh_token))
    .bind(user_agent)
    .bind(expires_at)
    .fetch_one(&pool)
    .await?;

    sqlx::query("UPDATE users SET last_login_at = now() WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await?;

    let claims = Claims::access(
        user.id,
        user.tenant_id,
        user.email.clone(),
        user.role.clone(),
        Some(session.id),
    );
    let access_token = auth::generate_jwt(&claims)?;

    Ok(TokenBundle {
        access_token,
        refresh_token,
        token_type: "Bearer",
        expires_in: security.access_token_ttl_secs,
        user,
    })
}

/// Rotate a refresh token: the presented token is retired and the session
/// row re-keyed in the same statement
pub async fn refresh(refresh_token: &str) -> Result<TokenBundle, AuthError> {
    let pool = DatabaseManager::pool().await?;
    let security = &config::config().security;

    let new_token = auth::generate_opaque_token();
    let new_expiry = Utc::now() + Duration::hours(security.refresh_token_ttl_hours);

    let session = sqlx::query_as::<_, Session>(
        "UPDATE sessions
         SET refresh_token_hash = $2, expires_at = $3
         WHERE refresh_token_hash = $1 AND revoked_at IS NULL AND expires_at > now()
         RETURNING *",
    )
    .bind(auth::token_digest(refresh_token))
    .bind(auth::token_digest(&new_token))
    .bind(new_expiry)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AuthError::InvalidToken("Refresh token is invalid or expired".to_string()))?;

    let user = get_user(session.user_id).await?;

    let claims = Claims::access(
        user.id,
        user.tenant_id,
        user.email.clone(),
        user.role.clone(),
        Some(session.id),
    );
    let access_token = auth::generate_jwt(&claims)?;

    Ok(TokenBundle {
        access_token,
        refresh_token: new_token,
        token_type: "Bearer",
        expires_in: security.access_token_ttl_secs,
        user,
    })
}

/// Active user row by id; trashed and deleted accounts are rejected
pub async fn get_user(user_id: Uuid) -> Result<User, AuthError> {
    let pool = DatabaseManager::pool().await?;
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    if user.trashed_at.is_some() {
        return Err(AuthError::AccountDisabled);
    }
    Ok(user)
}

pub async fn sessions_for_user(user_id: Uuid) -> Result<Vec<Session>, AuthError> {
    let pool = DatabaseManager::pool().await?;
    let sessions = sqlx::query_as::<_, Session>(
        "SELECT * FROM sessions
         WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > now()
         ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;
    Ok(sessions)
}

/// Revoke one of the caller's own sessions
pub async fn revoke_session(user_id: Uuid, session_id: Uuid) -> Result<(), AuthError> {
    let pool = DatabaseManager::pool().await?;
    let updated = sqlx::query(
        "UPDATE sessions SET revoked_at = now()
         WHERE id = $1 AND user_id = $2 AND revoked_at IS NULL",
    )
    .bind(session_id)
    .bind(user_id)
    .execute(&pool)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AuthError::SessionNotFound);
    }
    Ok(())
}

/// Begin MFA enrollment: store a fresh secret, disabled until activated
pub async fn mfa_enroll(user_id: Uuid) -> Result<(String, String), AuthError> {
    let user = get_user(user_id).await?;
    if user.mfa_enabled {
        return Err(AuthError::MfaAlreadyEnabled);
    }

    let secret = totp::generate_secret();
    let pool = DatabaseManager::pool().await?;
    sqlx::query("UPDATE users SET mfa_secret = $2, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .bind(&secret)
        .execute(&pool)
        .await?;

    let url = totp::otpauth_url("Atlas", &user.email, &secret);
    Ok((secret, url))
}

/// Prove possession of the enrolled secret and turn MFA on
pub async fn mfa_activate(user_id: Uuid, code: &str) -> Result<(), AuthError> {
    let user = get_user(user_id).await?;
    if user.mfa_enabled {
        return Err(AuthError::MfaAlreadyEnabled);
    }
    let secret = user.mfa_secret.ok_or(AuthError::MfaNotEnrolled)?;

    let ok = totp::verify_now(&secret, code).map_err(|_| AuthError::MfaCodeInvalid)?;
    if !ok {
        return Err(AuthError::MfaCodeInvalid);
    }

    let pool = DatabaseManager::pool().await?;
    sqlx::query("UPDATE users SET mfa_enabled = true, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .execute(&pool)
        .await?;
    Ok(())
}

/// Disabling requires a current code so a stolen session cannot silently
/// strip the second factor
pub async fn mfa_disable(user_id: Uuid, code: &str) -> Result<(), AuthError> {
    let user = get_user(user_id).await?;
    if !user.mfa_enabled {
        return Err(AuthError::MfaNotEnrolled);
    }
    let secret = user.mfa_secret.ok_or(AuthError::MfaNotEnrolled)?;

    let ok = totp::verify_now(&secret, code).map_err(|_| AuthError::MfaCodeInvalid)?;
    if !ok {
        return Err(AuthError::MfaCodeInvalid);
    }

    let pool = DatabaseManager::pool().await?;
    sqlx::query(
        "UPDATE users SET mfa_enabled = false, mfa_secret = NULL, updated_at = now() WHERE id = $1",
    )
    .bind(user_id)
    .execute(&pool)
    .await?;
    Ok(())
}

/// Admin user creation inside a tenant
pub async fn create_user(
    tenant_id: Uuid,
    email: &str,
    display_name: &str,
    passwd: &str,
    role: &str,
) -> Result<User, AuthError> {
    if !ROLES.contains(&role) {
        return Err(AuthError::Internal(format!("Unknown role: {}", role)));
    }
    password::validate_policy(passwd).map_err(|e| AuthError::WeakPassword(e.to_string()))?;
    let password_hash =
        password::hash_password(passwd).map_err(|e| AuthError::Internal(e.to_string()))?;

    let pool = DatabaseManager::pool().await?;
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (tenant_id, email, display_name, password_hash, role)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(tenant_id)
    .bind(email)
    .bind(display_name)
    .bind(password_hash)
    .bind(role)
    .fetch_one(&pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::EmailTaken,
        _ => AuthError::from(e),
    })?;

    Ok(user)
}
