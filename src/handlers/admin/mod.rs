pub mod ai_models;
pub mod audit;
pub mod oauth_clients;
pub mod quotas;
pub mod tenants;
pub mod users;
pub mod webhooks;

use serde::Deserialize;
use uuid::Uuid;

/// Optional tenant override accepted by admin endpoints; honored for
/// global admins only (AuthUser::scope_tenant)
#[derive(Debug, Deserialize)]
pub struct TenantScopeQuery {
    pub tenant_id: Option<Uuid>,
}
