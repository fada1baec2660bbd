//! Access/refresh token pair issuance.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::config::AuthConfig;
use super::errors::AuthError;
use crate::jwt::{ACCESS_TOKEN_TYPE, AccessClaims, RefreshClaims};

/// The authenticated subject, as returned by the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

impl Identity {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Signed tokens handed to a client after login or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Expiry timestamp `ttl` after `now`, failing when it leaves chrono's range.
fn expiry(now: DateTime<Utc>, ttl: Duration) -> Result<i64, AuthError> {
    now.checked_add_signed(ttl)
        .map(|at| at.timestamp())
        .ok_or_else(|| {
            tracing::error!(%now, ?ttl, "Token expiry out of range");
            AuthError::SigningFailed
        })
}

/// Claims for a new access token.
pub fn access_claims(
    identity: &Identity,
    config: &AuthConfig,
    now: DateTime<Utc>,
) -> Result<AccessClaims, AuthError> {
    Ok(AccessClaims {
        sub: identity.id.to_string(),
        name: identity.full_name(),
        iss: config.issuer.clone(),
        aud: config.audience.clone(),
        iat: now.timestamp(),
        exp: expiry(now, config.token_ttl)?,
        token_type: ACCESS_TOKEN_TYPE.to_string(),
    })
}

/// Claims for a new refresh token: subject and timestamps only.
pub fn refresh_claims(
    identity: &Identity,
    config: &AuthConfig,
    now: DateTime<Utc>,
) -> Result<RefreshClaims, AuthError> {
    Ok(RefreshClaims {
        sub: identity.id.to_string(),
        iat: now.timestamp(),
        exp: expiry(now, config.refresh_ttl)?,
    })
}

/// Build and sign both tokens of a pair. Pure apart from CPU work.
pub fn issue(
    identity: &Identity,
    config: &AuthConfig,
    now: DateTime<Utc>,
) -> Result<TokenPair, AuthError> {
    let signer = config.signer();
    let access_token = signer.sign(&access_claims(identity, config, now)?)?;
    let refresh_token = signer.sign(&refresh_claims(identity, config, now)?)?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}
