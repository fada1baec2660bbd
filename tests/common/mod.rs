#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use chrono::Duration;
use cinegate::{
    ServerConfig,
    auth::{AuthConfig, AuthSettings, Identity},
    create_app,
    db::Database,
    rate_limit::LoginQuota,
};

pub const TEST_IP: &str = "127.0.0.1";
pub const TEST_SECRET: &[u8] = b"test-jwt-secret-that-is-long-enough";
pub const TEST_ISSUER: &str = "api.example.com";

pub fn test_settings() -> AuthSettings {
    AuthSettings {
        issuer: TEST_ISSUER.to_string(),
        audience: "example.com".to_string(),
        secret: TEST_SECRET.to_vec(),
        token_ttl: Duration::minutes(15),
        refresh_ttl: Duration::hours(24),
        cookie_domain: "localhost".to_string(),
        cookie_path: "/".to_string(),
        cookie_name: "refresh_token".to_string(),
    }
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig::new(test_settings()).expect("Invalid test settings")
}

/// Create a test app and return (app, db, auth_config).
pub async fn create_test_app() -> (Router, Database, AuthConfig) {
    create_test_app_with(test_settings(), LoginQuota::default()).await
}

pub async fn create_test_app_with(
    settings: AuthSettings,
    login_quota: LoginQuota,
) -> (Router, Database, AuthConfig) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        auth: AuthConfig::new(settings.clone()).expect("Invalid test settings"),
        login_quota,
    };
    let auth = AuthConfig::new(settings).expect("Invalid test settings");
    (create_app(config), db, auth)
}

/// Insert Ada and return her identity.
pub async fn create_ada(db: &Database) -> Identity {
    let id = db
        .users()
        .create("ada@example.com", "Ada", "Lovelace")
        .await
        .expect("Failed to create user");
    Identity {
        id,
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
    }
}

pub fn login_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/authenticate")
        .header("content-type", "application/json")
        .header("x-forwarded-for", TEST_IP)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
