//! Contract tests for the public auth and oauth endpoints. These assert
//! the validation layer, which answers before any database is touched.

mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn login_without_tenant_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/v1/auth/login", server.base_url))
        .json(&json!({ "email": "dev@atlas.test", "password": "hunter2hunter2" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["tenant"].is_string());
    Ok(())
}

#[tokio::test]
async fn login_without_password_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/v1/auth/login", server.base_url))
        .json(&json!({ "tenant": "acme", "email": "dev@atlas.test" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn refresh_requires_token_field() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/v1/auth/refresh", server.base_url))
        .json(&json!({}))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn mfa_verify_requires_both_fields() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/v1/auth/mfa/verify", server.base_url))
        .json(&json!({ "code": "123456" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn oauth_token_rejects_unknown_grant_type() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/v1/oauth/token", server.base_url))
        .json(&json!({
            "grant_type": "authorization_code",
            "client_id": "atc_0000000000000000",
            "client_secret": "ats_secret"
        }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert!(body["message"]
        .as_str()
        .unwrap_or_default()
        .contains("unsupported_grant_type"));
    Ok(())
}

#[tokio::test]
async fn oauth_token_requires_client_id() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/v1/oauth/token", server.base_url))
        .json(&json!({ "grant_type": "client_credentials" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
