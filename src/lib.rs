pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod rate_limit;

use api::{AppState, create_api_router};
use auth::AuthConfig;
use axum::Router;
use db::Database;
use rate_limit::{LoginQuota, PRUNE_INTERVAL, RateLimitConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Token issuance, verification and cookie settings
    pub auth: AuthConfig,
    /// Per-client login rate
    pub login_quota: LoginQuota,
}

/// Create the application router with the given configuration.
pub fn create_app(config: ServerConfig) -> Router {
    let rate_limits = RateLimitConfig::new(config.login_quota);
    build_router(config, rate_limits)
}

fn build_router(config: ServerConfig, rate_limits: RateLimitConfig) -> Router {
    let state = AppState {
        db: config.db,
        auth: Arc::new(config.auth),
    };
    create_api_router(state, rate_limits)
}

/// Run the server on the given listener. This function blocks until the server exits.
///
/// Idle login rate-limit entries are pruned in the background while it runs.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let rate_limits = RateLimitConfig::new(config.login_quota);
    let pruner = rate_limits.spawn_pruner(PRUNE_INTERVAL);

    let app = build_router(config, rate_limits);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let result = axum::serve(listener, make_service).await;

    pruner.abort();
    result
}
