pub mod ai_models;
pub mod auth;
pub mod insights;
pub mod onboarding;
pub mod quotas;
pub mod shards;
