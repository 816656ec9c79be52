pub mod ai_model_service;
pub mod audit_service;
pub mod auth_service;
pub mod insight_service;
pub mod oauth_service;
pub mod onboarding_service;
pub mod quota_service;
pub mod shard_service;
pub mod tenant_service;
pub mod webhook_service;
