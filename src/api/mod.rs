mod admin;
mod error;
mod session;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::{AuthConfig, require_bearer};
use crate::db::Database;
use crate::rate_limit::{RateLimitConfig, rate_limit_login};

pub use error::ApiError;

/// Largest accepted JSON request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// State shared by every API handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: Arc<AuthConfig>,
}

/// Create the API router.
pub fn create_api_router(state: AppState, rate_limits: RateLimitConfig) -> Router {
    let login = Router::new()
        .route("/authenticate", post(session::authenticate))
        .route_layer(middleware::from_fn_with_state(rate_limits, rate_limit_login))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    let admin = Router::new()
        .route("/session", get(admin::session))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            require_bearer,
        ));

    Router::new()
        .route("/", get(home))
        .route("/refresh", get(session::refresh))
        .route("/logout", get(session::logout))
        .merge(login)
        .nest("/admin", admin)
        .with_state(state)
}

#[derive(Serialize)]
struct Status {
    status: &'static str,
    message: &'static str,
    version: &'static str,
}

async fn home() -> Json<Status> {
    Json(Status {
        status: "active",
        message: "Cinegate up and running",
        version: env!("CARGO_PKG_VERSION"),
    })
}
