//! Stateless bearer-token authentication.
//!
//! Login issues an access token (returned in the body) and a refresh token
//! (returned in the body and as an HttpOnly cookie). Nothing is stored
//! server-side: a token is valid exactly while its signature checks out and
//! its expiry has not passed.

mod bearer;
mod config;
mod cookie;
mod errors;
mod issuer;

pub use bearer::{AuthenticatedUser, BEARER_SCHEME, authenticate, require_bearer};
pub use config::{AuthConfig, AuthSettings, ConfigError, MAX_TTL_SECS};
pub use cookie::{RefreshCookie, SameSite, build_expired_cookie, build_refresh_cookie, get_cookie};
pub(crate) use errors::ErrorResponse;
pub use errors::AuthError;
pub use issuer::{Identity, TokenPair, access_claims, issue, refresh_claims};
