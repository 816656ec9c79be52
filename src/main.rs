use axum::{routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use atlas_api::database::manager::DatabaseManager;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    let config = atlas_api::config::config();
    tracing_subscriber::fmt::init();
    tracing::info!("Starting Atlas API in {:?} mode", config.environment);

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("ATLAS_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("Atlas API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // Bearer-token tiers
        .merge(protected_routes())
        .merge(admin_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn public_routes() -> Router {
    use atlas_api::handlers::public::{auth, oauth};
    use axum::routing::post;

    Router::new()
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/mfa/verify", post(auth::mfa_verify))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/oauth/token", post(oauth::token))
}

fn protected_routes() -> Router {
    use atlas_api::handlers::protected::{ai_models, auth, insights, onboarding, quotas, shards};
    use atlas_api::middleware::auth::jwt_auth_middleware;
    use axum::routing::{delete, post};

    Router::new()
        // Session and MFA management for authenticated users
        .route("/api/v1/auth/whoami", get(auth::whoami))
        .route("/api/v1/auth/session", delete(auth::logout))
        .route("/api/v1/sessions", get(auth::sessions_list))
        .route("/api/v1/sessions/:id", delete(auth::session_revoke))
        .route("/api/v1/auth/mfa/enroll", post(auth::mfa_enroll))
        .route("/api/v1/auth/mfa/activate", post(auth::mfa_activate))
        .route("/api/v1/auth/mfa", delete(auth::mfa_disable))
        // Shards and their history
        .route("/api/v1/shards", get(shards::list).post(shards::create))
        .route(
            "/api/v1/shards/:id",
            get(shards::get)
                .patch(shards::update)
                .delete(shards::delete),
        )
        .route("/api/v1/shards/:id/restore", post(shards::restore))
        .route("/api/v1/shards/:id/revisions", get(shards::revisions))
        .route(
            "/api/v1/shards/:id/revisions/:number",
            get(shards::revision),
        )
        .route("/api/v1/shards/:id/revert", post(shards::revert))
        // Collaborative insights
        .route(
            "/api/v1/insights",
            get(insights::list).post(insights::create),
        )
        .route(
            "/api/v1/insights/:id",
            get(insights::get)
                .patch(insights::update)
                .delete(insights::delete),
        )
        // Read-only tenant state
        .route("/api/v1/quotas", get(quotas::list))
        .route("/api/v1/ai/models", get(ai_models::list))
        // Onboarding checklist
        .route(
            "/api/v1/onboarding",
            get(onboarding::get).patch(onboarding::update),
        )
        .route_layer(axum::middleware::from_fn(jwt_auth_middleware))
}

fn admin_routes() -> Router {
    use atlas_api::handlers::admin::{
        ai_models, audit, oauth_clients, quotas, tenants, users, webhooks,
    };
    use atlas_api::middleware::auth::jwt_auth_middleware;
    use axum::routing::{post, put};

    Router::new()
        // Tenant lifecycle (root)
        .route(
            "/api/v1/admin/tenants",
            get(tenants::list).post(tenants::create),
        )
        .route(
            "/api/v1/admin/tenants/:id",
            get(tenants::get)
                .patch(tenants::update)
                .delete(tenants::delete),
        )
        .route("/api/v1/admin/tenants/:id/restore", post(tenants::restore))
        // Users
        .route("/api/v1/admin/users", post(users::create))
        // Quotas
        .route("/api/v1/admin/quotas/:resource", put(quotas::set_limit))
        // OAuth2 clients
        .route(
            "/api/v1/admin/oauth/clients",
            get(oauth_clients::list).post(oauth_clients::create),
        )
        .route(
            "/api/v1/admin/oauth/clients/:id",
            get(oauth_clients::get)
                .patch(oauth_clients::update)
                .delete(oauth_clients::delete),
        )
        // AI model configuration
        .route("/api/v1/admin/ai/models", get(ai_models::list))
        .route(
            "/api/v1/admin/ai/models/:kind",
            put(ai_models::upsert).delete(ai_models::delete),
        )
        // Webhooks
        .route(
            "/api/v1/admin/webhooks",
            get(webhooks::list).post(webhooks::create),
        )
        .route(
            "/api/v1/admin/webhooks/:id",
            axum::routing::patch(webhooks::update).delete(webhooks::delete),
        )
        // Audit trail
        .route("/api/v1/admin/audit", get(audit::list))
        .route_layer(axum::middleware::from_fn(jwt_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Atlas API",
            "version": version,
            "description": "Multi-tenant business SaaS platform API",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/api/v1/auth/* (login, refresh, mfa)",
                "oauth": "/api/v1/oauth/token (client_credentials)",
                "shards": "/api/v1/shards[/:id] (protected)",
                "revisions": "/api/v1/shards/:id/revisions[/:number] (protected)",
                "insights": "/api/v1/insights[/:id] (protected)",
                "quotas": "/api/v1/quotas (protected)",
                "onboarding": "/api/v1/onboarding (protected)",
                "ai": "/api/v1/ai/models (protected)",
                "admin": "/api/v1/admin/* (admin/root role)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
