use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::OnceLock;
use std::time::Duration;
use uuid::Uuid;

use crate::auth::generate_opaque_token;
use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::webhook::{Webhook, EVENTS};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("{0}")]
    InvalidUrl(String),
    #[error("Unknown webhook event: {0}")]
    UnknownEvent(String),
    #[error("At least one event must be subscribed")]
    NoEvents,
    #[error("Webhook not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for WebhookError {
    fn from(err: sqlx::Error) -> Self {
        WebhookError::Database(DatabaseError::Sqlx(err))
    }
}

fn validate_url(raw: &str) -> Result<(), WebhookError> {
    let parsed = url::Url::parse(raw)
        .map_err(|_| WebhookError::InvalidUrl(format!("Not a valid URL: {}", raw)))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(WebhookError::InvalidUrl(
            "Webhook URL must be http or https".to_string(),
        ));
    }
    Ok(())
}

fn validate_events(events: &[String]) -> Result<(), WebhookError> {
    if events.is_empty() {
        return Err(WebhookError::NoEvents);
    }
    for event in events {
        if !EVENTS.contains(&event.as_str()) {
            return Err(WebhookError::UnknownEvent(event.clone()));
        }
    }
    Ok(())
}

/// Register an endpoint. The signing secret is generated here and
/// returned exactly once.
pub async fn create(
    tenant_id: Uuid,
    url: &str,
    events: Vec<String>,
) -> Result<(Webhook, String), WebhookError> {
    validate_url(url)?;
    validate_events(&events)?;

    let secret = generate_opaque_token();
    let pool = DatabaseManager::pool().await?;
    let webhook = sqlx::query_as::<_, Webhook>(
        "INSERT INTO webhooks (tenant_id, url, secret, events, active, failure_count)
         VALUES ($1, $2, $3, $4, true, 0)
         RETURNING *",
    )
    .bind(tenant_id)
    .bind(url)
    .bind(&secret)
    .bind(&events)
    .fetch_one(&pool)
    .await?;

    Ok((webhook, secret))
}

pub async fn list(tenant_id: Uuid) -> Result<Vec<Webhook>, WebhookError> {
    let pool = DatabaseManager::pool().await?;
    let webhooks = sqlx::query_as::<_, Webhook>(
        "SELECT * FROM webhooks WHERE tenant_id = $1 ORDER BY created_at DESC",
    )
    .bind(tenant_id)
    .fetch_all(&pool)
    .await?;
    Ok(webhooks)
}

pub async fn update(
    tenant_id: Uuid,
    id: Uuid,
    url: Option<String>,
    events: Option<Vec<String>>,
    active: Option<bool>,
) -> Result<Webhook, WebhookError> {
    if let Some(url) = &url {
        validate_url(url)?;
    }
    if let Some(events) = &events {
        validate_events(events)?;
    }

    let pool = DatabaseManager::pool().await?;
    sqlx::query_as::<_, Webhook>(
        "UPDATE webhooks
         SET url = COALESCE($3, url),
             events = COALESCE($4, events),
             active = COALESCE($5, active),
             failure_count = CASE WHEN $5 = true THEN 0 ELSE failure_count END,
             updated_at = now()
         WHERE id = $1 AND tenant_id = $2
         RETURNING *",
    )
    .bind(id)
    .bind(tenant_id)
    .bind(url)
    .bind(events)
    .bind(active)
    .fetch_optional(&pool)
    .await?
    .ok_or(WebhookError::NotFound)
}

pub async fn delete(tenant_id: Uuid, id: Uuid) -> Result<(), WebhookError> {
    let pool = DatabaseManager::pool().await?;
    let deleted = sqlx::query("DELETE FROM webhooks WHERE id = $1 AND tenant_id = $2")
        .bind(id)
        .bind(tenant_id)
        .execute(&pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(WebhookError::NotFound);
    }
    Ok(())
}

/// Signature over "{timestamp}.{body}" so a captured payload cannot be
/// replayed later with a fresh timestamp
pub fn sign(secret: &str, timestamp: &str, body: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body.as_bytes());
    STANDARD_NO_PAD.encode(mac.finalize().into_bytes())
}

fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(
                config::config().webhook.delivery_timeout_secs,
            ))
            .build()
            .unwrap_or_default()
    })
}

/// Fan an event out to every subscribed endpoint. Runs detached from the
/// request; the caller never waits on delivery.
pub fn dispatch(tenant_id: Uuid, event: &'static str, data: Value) {
    tokio::spawn(async move {
        if let Err(e) = dispatch_inner(tenant_id, event, data).await {
            tracing::warn!("Webhook dispatch failed for {}: {}", event, e);
        }
    });
}

async fn dispatch_inner(
    tenant_id: Uuid,
    event: &'static str,
    data: Value,
) -> Result<(), WebhookError> {
    let pool = DatabaseManager::pool().await?;
    let webhooks = sqlx::query_as::<_, Webhook>(
        "SELECT * FROM webhooks WHERE tenant_id = $1 AND active = true AND $2 = ANY(events)",
    )
    .bind(tenant_id)
    .bind(event)
    .fetch_all(&pool)
    .await?;

    for webhook in webhooks {
        let payload = json!({
            "event": event,
            "tenant_id": tenant_id,
            "data": data,
            "timestamp": chrono::Utc::now(),
        });
        deliver(&webhook, payload).await;
    }
    Ok(())
}

/// Attempt delivery with doubling backoff; track consecutive failures and
/// auto-disable past the configured ceiling
async fn deliver(webhook: &Webhook, payload: Value) {
    let cfg = &config::config().webhook;
    let body = payload.to_string();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = sign(&webhook.secret, &timestamp, &body);

    let mut delivered = false;
    for attempt in 0..cfg.delivery_attempts {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
        }
        let result = http_client()
            .post(&webhook.url)
            .header("content-type", "application/json")
            .header("x-atlas-signature", &signature)
            .header("x-atlas-timestamp", &timestamp)
            .body(body.clone())
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {
                delivered = true;
                break;
            }
            Ok(response) => {
                tracing::debug!(
                    "Webhook {} returned {} (attempt {})",
                    webhook.id,
                    response.status(),
                    attempt + 1
                );
            }
            Err(e) => {
                tracing::debug!("Webhook {} error (attempt {}): {}", webhook.id, attempt + 1, e);
            }
        }
    }

    let pool = match DatabaseManager::pool().await {
        Ok(pool) => pool,
        Err(_) => return,
    };
    let result = if delivered {
        sqlx::query("UPDATE webhooks SET failure_count = 0 WHERE id = $1")
            .bind(webhook.id)
            .execute(&pool)
            .await
    } else {
        sqlx::query(
            "UPDATE webhooks
             SET failure_count = failure_count + 1,
                 active = (failure_count + 1) < $2
             WHERE id = $1",
        )
        .bind(webhook.id)
        .bind(config::config().webhook.max_failures)
        .execute(&pool)
        .await
    };
    if let Err(e) = result {
        tracing::warn!("Failed to record webhook outcome for {}: {}", webhook.id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_validation() {
        assert!(validate_url("https://hooks.example.com/atlas").is_ok());
        assert!(validate_url("http://localhost:9000/hook").is_ok());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn event_validation() {
        assert!(validate_events(&["shard.created".to_string()]).is_ok());
        assert!(matches!(validate_events(&[]), Err(WebhookError::NoEvents)));
        assert!(matches!(
            validate_events(&["shard.exploded".to_string()]),
            Err(WebhookError::UnknownEvent(_))
        ));
    }

    #[test]
    fn signature_is_deterministic_and_keyed() {
        let sig1 = sign("secret-a", "1700000000", r#"{"event":"shard.created"}"#);
        let sig2 = sign("secret-a", "1700000000", r#"{"event":"shard.created"}"#);
        let sig3 = sign("secret-b", "1700000000", r#"{"event":"shard.created"}"#);
        let sig4 = sign("secret-a", "1700000001", r#"{"event":"shard.created"}"#);
        assert_eq!(sig1, sig2);
        assert_ne!(sig1, sig3);
        assert_ne!(sig1, sig4);
        assert!(!sig1.is_empty());
    }
}
