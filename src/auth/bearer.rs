//! Bearer token extraction and verification.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use tracing::debug;

use super::config::AuthConfig;
use super::errors::AuthError;
use crate::jwt::AccessClaims;

/// Authorization scheme accepted on protected routes. Case-sensitive.
pub const BEARER_SCHEME: &str = "Bearer";

/// A caller whose access token verified. Inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// The raw access token as presented
    pub token: String,
    /// Its verified claims
    pub claims: AccessClaims,
}

/// Extract and verify the bearer token of a request.
///
/// `Vary: Authorization` is appended to `response` before anything else, so it
/// is present on every outcome.
pub fn authenticate(
    request: &HeaderMap,
    response: &mut HeaderMap,
    config: &AuthConfig,
    now: DateTime<Utc>,
) -> Result<AuthenticatedUser, AuthError> {
    response.append(header::VARY, HeaderValue::from_static("Authorization"));

    let value = request
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::NoAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;
    if value.is_empty() {
        return Err(AuthError::NoAuthHeader);
    }

    let mut parts = value.split(' ');
    let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AuthError::InvalidAuthHeader);
    };
    if scheme != BEARER_SCHEME {
        return Err(AuthError::InvalidAuthHeader);
    }

    let claims: AccessClaims = config.signer().verify(token, now)?;

    if claims.iss != config.issuer {
        return Err(AuthError::InvalidIssuer);
    }

    Ok(AuthenticatedUser {
        token: token.to_string(),
        claims,
    })
}

/// Middleware guarding a route group with [`authenticate`].
///
/// Handlers read the caller through `Extension<AuthenticatedUser>`.
pub async fn require_bearer(
    State(config): State<Arc<AuthConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut extra = HeaderMap::new();
    let result = authenticate(request.headers(), &mut extra, &config, Utc::now());

    let mut response = match result {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            debug!(
                reason = %e,
                refreshable = e.is_expired(),
                path = %request.uri().path(),
                "Rejected request"
            );
            e.into_response()
        }
    };

    let headers = response.headers_mut();
    for (name, value) in extra.iter() {
        headers.append(name.clone(), value.clone());
    }
    response
}
