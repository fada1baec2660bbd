//! Refresh-token cookie transport.

use std::fmt;

use axum::http::{HeaderMap, HeaderValue, header, header::InvalidHeaderValue};
use chrono::{DateTime, Utc};

use super::config::AuthConfig;

/// `Expires` attribute format (IMF-fixdate).
const COOKIE_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// `SameSite` policy. The refresh cookie is only ever sent same-site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
        }
    }
}

/// A `Set-Cookie` carrying (or clearing) the refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub domain: String,
    /// Absolute expiry, for clients that ignore `Max-Age`
    pub expires: DateTime<Utc>,
    /// Relative expiry in seconds; negative means delete now
    pub max_age: i64,
    pub same_site: SameSite,
    pub http_only: bool,
    pub secure: bool,
}

impl fmt::Display for RefreshCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if !self.path.is_empty() {
            write!(f, "; Path={}", self.path)?;
        }
        if !self.domain.is_empty() {
            write!(f, "; Domain={}", self.domain)?;
        }
        write!(f, "; Expires={}", self.expires.format(COOKIE_DATE_FORMAT))?;
        // Browsers treat any non-positive Max-Age as "expire now".
        write!(f, "; Max-Age={}", self.max_age.max(0))?;
        if self.http_only {
            write!(f, "; HttpOnly")?;
        }
        if self.secure {
            write!(f, "; Secure")?;
        }
        write!(f, "; SameSite={}", self.same_site)
    }
}

impl RefreshCookie {
    /// Render as a `Set-Cookie` header value.
    pub fn to_header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.to_string())
    }
}

/// Cookie delivering a freshly issued refresh token.
pub fn build_refresh_cookie(
    refresh_token: &str,
    config: &AuthConfig,
    now: DateTime<Utc>,
) -> RefreshCookie {
    RefreshCookie {
        name: config.cookie_name.clone(),
        value: refresh_token.to_string(),
        path: config.cookie_path.clone(),
        domain: config.cookie_domain.clone(),
        expires: now
            .checked_add_signed(config.refresh_ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
        max_age: config.refresh_ttl.num_seconds(),
        same_site: SameSite::Strict,
        http_only: true,
        secure: true,
    }
}

/// Cookie instructing the client to drop its refresh token.
pub fn build_expired_cookie(config: &AuthConfig) -> RefreshCookie {
    RefreshCookie {
        name: config.cookie_name.clone(),
        value: String::new(),
        path: config.cookie_path.clone(),
        domain: config.cookie_domain.clone(),
        expires: DateTime::<Utc>::UNIX_EPOCH,
        max_age: -1,
        same_site: SameSite::Strict,
        http_only: true,
        secure: true,
    }
}

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}
