//! Endpoints behind the bearer-token guard.
//!
//! - GET `/session` - Describe the verified access token

use axum::{Extension, Json};
use serde::Serialize;

use crate::auth::AuthenticatedUser;

#[derive(Serialize)]
pub(super) struct SessionInfo {
    subject: String,
    name: String,
    issuer: String,
    expires_at: i64,
}

pub(super) async fn session(Extension(user): Extension<AuthenticatedUser>) -> Json<SessionInfo> {
    let claims = user.claims;
    Json(SessionInfo {
        subject: claims.sub,
        name: claims.name,
        issuer: claims.iss,
        expires_at: claims.exp,
    })
}
