//! Process-wide authentication settings.
//!
//! Built once at startup and shared read-only (behind an `Arc`) by every request.

use chrono::Duration;

use crate::jwt::TokenSigner;

/// Longest accepted token lifetime: ten years.
pub const MAX_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Raw settings as supplied by the command line or a test.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub issuer: String,
    pub audience: String,
    pub secret: Vec<u8>,
    pub token_ttl: Duration,
    pub refresh_ttl: Duration,
    pub cookie_domain: String,
    pub cookie_path: String,
    pub cookie_name: String,
}

/// Errors rejecting a set of authentication settings.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT secret must not be empty")]
    EmptySecret,
    #[error("{0} must be a positive duration")]
    NonPositiveTtl(&'static str),
    #[error("{0} must be a whole number of seconds, at most {max}", max = MAX_TTL_SECS)]
    InvalidTtl(&'static str),
    #[error("cookie name must not be empty")]
    EmptyCookieName,
}

/// Validated, immutable authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub issuer: String,
    pub audience: String,
    pub token_ttl: Duration,
    pub refresh_ttl: Duration,
    pub cookie_domain: String,
    pub cookie_path: String,
    pub cookie_name: String,
    signer: TokenSigner,
}

impl AuthConfig {
    pub fn new(settings: AuthSettings) -> Result<Self, ConfigError> {
        if settings.secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        check_ttl(settings.token_ttl, "token TTL")?;
        check_ttl(settings.refresh_ttl, "refresh TTL")?;
        if settings.cookie_name.is_empty() {
            return Err(ConfigError::EmptyCookieName);
        }

        Ok(Self {
            signer: TokenSigner::new(&settings.secret),
            issuer: settings.issuer,
            audience: settings.audience,
            token_ttl: settings.token_ttl,
            refresh_ttl: settings.refresh_ttl,
            cookie_domain: settings.cookie_domain,
            cookie_path: settings.cookie_path,
            cookie_name: settings.cookie_name,
        })
    }

    /// Signer keyed by the shared secret.
    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }
}

/// Token timestamps have one-second resolution, so a lifetime must span at
/// least one whole second for `exp` to land after `iat`.
fn check_ttl(ttl: Duration, name: &'static str) -> Result<(), ConfigError> {
    if ttl <= Duration::zero() {
        return Err(ConfigError::NonPositiveTtl(name));
    }
    if ttl.subsec_nanos() != 0 || ttl > Duration::seconds(MAX_TTL_SECS) {
        return Err(ConfigError::InvalidTtl(name));
    }
    Ok(())
}
