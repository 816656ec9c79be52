use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub revision: RevisionConfig,
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub default_limit: i64,
    pub max_limit: i64,
    pub login_rate_limit_attempts: u32,
    pub login_rate_limit_window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_hours: i64,
    pub mfa_token_ttl_secs: i64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionConfig {
    /// Every Nth revision is stored as a full snapshot; the rest are deltas.
    pub snapshot_interval: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub delivery_attempts: u32,
    pub delivery_timeout_secs: u64,
    /// Consecutive failures before an endpoint is auto-disabled.
    pub max_failures: i32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Environment picks the defaults, specific env vars override fields
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("API_DEFAULT_LIMIT") {
            self.api.default_limit = v.parse().unwrap_or(self.api.default_limit);
        }
        if let Ok(v) = env::var("API_MAX_LIMIT") {
            self.api.max_limit = v.parse().unwrap_or(self.api.max_limit);
        }
        if let Ok(v) = env::var("API_LOGIN_RATE_LIMIT_ATTEMPTS") {
            self.api.login_rate_limit_attempts =
                v.parse().unwrap_or(self.api.login_rate_limit_attempts);
        }
        if let Ok(v) = env::var("API_LOGIN_RATE_LIMIT_WINDOW_SECS") {
            self.api.login_rate_limit_window_secs =
                v.parse().unwrap_or(self.api.login_rate_limit_window_secs);
        }
        if let Ok(v) = env::var("SECURITY_ACCESS_TOKEN_TTL_SECS") {
            self.security.access_token_ttl_secs =
                v.parse().unwrap_or(self.security.access_token_ttl_secs);
        }
        if let Ok(v) = env::var("SECURITY_REFRESH_TOKEN_TTL_HOURS") {
            self.security.refresh_token_ttl_hours =
                v.parse().unwrap_or(self.security.refresh_token_ttl_hours);
        }
        if let Ok(v) = env::var("SECURITY_MFA_TOKEN_TTL_SECS") {
            self.security.mfa_token_ttl_secs =
                v.parse().unwrap_or(self.security.mfa_token_ttl_secs);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("REVISION_SNAPSHOT_INTERVAL") {
            self.revision.snapshot_interval = v.parse().unwrap_or(self.revision.snapshot_interval);
        }
        if let Ok(v) = env::var("WEBHOOK_DELIVERY_ATTEMPTS") {
            self.webhook.delivery_attempts = v.parse().unwrap_or(self.webhook.delivery_attempts);
        }
        if let Ok(v) = env::var("WEBHOOK_DELIVERY_TIMEOUT_SECS") {
            self.webhook.delivery_timeout_secs =
                v.parse().unwrap_or(self.webhook.delivery_timeout_secs);
        }
        if let Ok(v) = env::var("WEBHOOK_MAX_FAILURES") {
            self.webhook.max_failures = v.parse().unwrap_or(self.webhook.max_failures);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                default_limit: 50,
                max_limit: 1000,
                login_rate_limit_attempts: 100,
                login_rate_limit_window_secs: 60,
            },
            security: SecurityConfig {
                jwt_secret: "atlas-dev-secret".to_string(),
                access_token_ttl_secs: 3600,
                refresh_token_ttl_hours: 24 * 7,
                mfa_token_ttl_secs: 300,
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
            revision: RevisionConfig {
                snapshot_interval: 10,
            },
            webhook: WebhookConfig {
                delivery_attempts: 3,
                delivery_timeout_secs: 10,
                max_failures: 20,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                default_limit: 50,
                max_limit: 500,
                login_rate_limit_attempts: 10,
                login_rate_limit_window_secs: 60,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                access_token_ttl_secs: 3600,
                refresh_token_ttl_hours: 24,
                mfa_token_ttl_secs: 300,
                enable_cors: true,
                cors_origins: vec!["https://staging.atlas.example.com".to_string()],
            },
            revision: RevisionConfig {
                snapshot_interval: 10,
            },
            webhook: WebhookConfig {
                delivery_attempts: 3,
                delivery_timeout_secs: 10,
                max_failures: 20,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                default_limit: 50,
                max_limit: 100,
                login_rate_limit_attempts: 5,
                login_rate_limit_window_secs: 60,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                access_token_ttl_secs: 900,
                refresh_token_ttl_hours: 12,
                mfa_token_ttl_secs: 300,
                enable_cors: true,
                cors_origins: vec!["https://app.atlas.example.com".to_string()],
            },
            revision: RevisionConfig {
                snapshot_interval: 10,
            },
            webhook: WebhookConfig {
                delivery_attempts: 3,
                delivery_timeout_secs: 10,
                max_failures: 20,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_defaults() {
        let config = AppConfig::development();
        assert_eq!(config.api.max_limit, 1000);
        assert!(!config.security.jwt_secret.is_empty());
        assert_eq!(config.revision.snapshot_interval, 10);
    }

    #[test]
    fn production_tightens_limits() {
        let config = AppConfig::production();
        assert_eq!(config.api.max_limit, 100);
        assert_eq!(config.api.login_rate_limit_attempts, 5);
        // Production must take its secret from the environment
        assert!(config.security.jwt_secret.is_empty());
    }

    #[test]
    fn production_short_access_tokens() {
        let dev = AppConfig::development();
        let prod = AppConfig::production();
        assert!(prod.security.access_token_ttl_secs < dev.security.access_token_ttl_secs);
    }
}
