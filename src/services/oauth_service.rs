use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{self, Claims};
use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::oauth_client::OAuth2Client;
use crate::database::models::quota::RESOURCE_API_CLIENTS;
use crate::database::models::user::ROLE_SERVICE;
use crate::services::{audit_service, quota_service, tenant_service};

pub const GRANT_CLIENT_CREDENTIALS: &str = "client_credentials";

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("unsupported_grant_type: {0}")]
    UnsupportedGrantType(String),
    #[error("invalid_client")]
    InvalidClient,
    #[error("OAuth2 client not found")]
    NotFound,
    #[error(transparent)]
    Quota(#[from] quota_service::QuotaError),
    #[error("Internal OAuth error: {0}")]
    Internal(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for OAuthError {
    fn from(err: sqlx::Error) -> Self {
        OAuthError::Database(DatabaseError::Sqlx(err))
    }
}

/// RFC 6749 §5.1 token response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub scope: String,
}

/// Register a client. The plaintext secret is returned once; only its
/// digest is stored.
pub async fn create_client(
    tenant_id: Uuid,
    actor_id: Uuid,
    name: &str,
    scopes: Vec<String>,
) -> Result<(OAuth2Client, String), OAuthError> {
    let client_id = format!("atc_{}", &auth::generate_opaque_token()[..16]);
    let client_secret = format!("ats_{}", auth::generate_opaque_token());

    let pool = DatabaseManager::pool().await?;
    let mut tx = pool.begin().await?;

    quota_service::consume(&mut *tx, tenant_id, RESOURCE_API_CLIENTS).await?;

    let client = sqlx::query_as::<_, OAuth2Client>(
        "INSERT INTO oauth_clients (tenant_id, name, client_id, client_secret_hash, scopes, active)
         VALUES ($1, $2, $3, $4, $5, true)
         RETURNING *",
    )
    .bind(tenant_id)
    .bind(name)
    .bind(&client_id)
    .bind(auth::token_digest(&client_secret))
    .bind(&scopes)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    audit_service::record(
        tenant_id,
        Some(actor_id),
        "oauth_client.create",
        "oauth_client",
        Some(client.id),
        json!({ "client_id": client.client_id, "name": client.name }),
    );

    Ok((client, client_secret))
}

pub async fn list_clients(tenant_id: Uuid) -> Result<Vec<OAuth2Client>, OAuthError> {
    let pool = DatabaseManager::pool().await?;
    let clients = sqlx::query_as::<_, OAuth2Client>(
        "SELECT * FROM oauth_clients WHERE tenant_id = $1 ORDER BY created_at DESC",
    )
    .bind(tenant_id)
    .fetch_all(&pool)
    .await?;
    Ok(clients)
}

pub async fn get_client(tenant_id: Uuid, id: Uuid) -> Result<OAuth2Client, OAuthError> {
    let pool = DatabaseManager::pool().await?;
    sqlx::query_as::<_, OAuth2Client>(
        "SELECT * FROM oauth_clients WHERE id = $1 AND tenant_id = $2",
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(OAuthError::NotFound)
}

pub async fn update_client(
    tenant_id: Uuid,
    actor_id: Uuid,
    id: Uuid,
    name: Option<String>,
    scopes: Option<Vec<String>>,
    active: Option<bool>,
) -> Result<OAuth2Client, OAuthError> {
    let pool = DatabaseManager::pool().await?;
    let client = sqlx::query_as::<_, OAuth2Client>(
        "UPDATE oauth_clients
         SET name = COALESCE($3, name),
             scopes = COALESCE($4, scopes),
             active = COALESCE($5, active),
             updated_at = now()
         WHERE id = $1 AND tenant_id = $2
         RETURNING *",
    )
    .bind(id)
    .bind(tenant_id)
    .bind(name)
    .bind(scopes)
    .bind(active)
    .fetch_optional(&pool)
    .await?
    .ok_or(OAuthError::NotFound)?;

    audit_service::record(
        tenant_id,
        Some(actor_id),
        "oauth_client.update",
        "oauth_client",
        Some(id),
        json!({ "active": client.active }),
    );

    Ok(client)
}

/// Permanent removal; the quota unit is released in the same transaction
pub async fn delete_client(tenant_id: Uuid, actor_id: Uuid, id: Uuid) -> Result<(), OAuthError> {
    let pool = DatabaseManager::pool().await?;
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM oauth_clients WHERE id = $1 AND tenant_id = $2")
        .bind(id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(OAuthError::NotFound);
    }

    quota_service::release(&mut *tx, tenant_id, RESOURCE_API_CLIENTS).await?;
    tx.commit().await?;

    audit_service::record(
        tenant_id,
        Some(actor_id),
        "oauth_client.delete",
        "oauth_client",
        Some(id),
        serde_json::Value::Null,
    );
    Ok(())
}

/// client_credentials token exchange. Every failure mode past the grant
/// check is the same invalid_client so probing reveals nothing.
pub async fn token(
    grant_type: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<TokenResponse, OAuthError> {
    if grant_type != GRANT_CLIENT_CREDENTIALS {
        return Err(OAuthError::UnsupportedGrantType(grant_type.to_string()));
    }

    let pool = DatabaseManager::pool().await?;
    let client = sqlx::query_as::<_, OAuth2Client>(
        "SELECT * FROM oauth_clients WHERE client_id = $1 AND active = true",
    )
    .bind(client_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(OAuthError::InvalidClient)?;

    if auth::token_digest(client_secret) != client.client_secret_hash {
        return Err(OAuthError::InvalidClient);
    }

    let tenant = tenant_service::get(client.tenant_id)
        .await
        .map_err(|_| OAuthError::InvalidClient)?;
    if !tenant.active {
        return Err(OAuthError::InvalidClient);
    }

    let claims = Claims::access(
        client.id,
        client.tenant_id,
        client.client_id.clone(),
        ROLE_SERVICE.to_string(),
        None,
    );
    let access_token =
        auth::generate_jwt(&claims).map_err(|e| OAuthError::Internal(e.to_string()))?;

    audit_service::record(
        client.tenant_id,
        None,
        "oauth_client.token",
        "oauth_client",
        Some(client.id),
        json!({ "client_id": client.client_id }),
    );

    Ok(TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in: config::config().security.access_token_ttl_secs,
        scope: client.scopes.join(" "),
    })
}
