//! JWT signing and verification.
//!
//! Tokens are HS256 compact JWTs. Verification pins the HMAC family before any
//! key material is touched, so a token declaring an asymmetric algorithm is
//! rejected outright instead of being checked against the shared secret.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Value of the `typ` claim carried by access tokens.
pub const ACCESS_TOKEN_TYPE: &str = "JWT";

/// Algorithms accepted on verification. Signing always uses HS256.
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Claims of a short-lived access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (stringified user id)
    pub sub: String,
    /// Display name, "first last"
    pub name: String,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token type, always "JWT"
    #[serde(rename = "typ")]
    pub token_type: String,
}

/// Claims of a refresh token. Deliberately minimal: no issuer, audience or name.
///
/// Unknown fields are rejected so an access token can never pass as a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshClaims {
    /// Subject (stringified user id)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Claim sets that carry an expiry the verifier must enforce.
pub trait ExpiringClaims {
    fn expires_at(&self) -> i64;
}

impl ExpiringClaims for AccessClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}

impl ExpiringClaims for RefreshClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Not a three-part compact token, or a part failed to decode
    #[error("malformed token")]
    MalformedToken,
    /// Declared algorithm is outside the HMAC family
    #[error("unexpected signing method: {0}")]
    UnsupportedAlgorithm(String),
    /// Recomputed signature does not match
    #[error("token signature is invalid")]
    SignatureMismatch,
    /// `exp` lies before the verification time
    #[error("token has expired")]
    Expired,
    /// Encoding the token failed
    #[error("failed to sign token: {0}")]
    SigningFailed(#[source] jsonwebtoken::errors::Error),
}

/// Only the header field the algorithm pin needs.
#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// HMAC keys for signing and verifying tokens.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Create a signer keyed by the given shared secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Sign a claim set into a compact HS256 token.
    pub fn sign<C: Serialize>(&self, claims: &C) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(TokenError::SigningFailed)
    }

    /// Verify a compact token and decode its claims.
    ///
    /// The signature is checked in constant time by `jsonwebtoken`. Expiry is
    /// compared against `now` without leeway; a token is still valid in the
    /// second its `exp` names.
    pub fn verify<C>(&self, token: &str, now: DateTime<Utc>) -> Result<C, TokenError>
    where
        C: DeserializeOwned + ExpiringClaims,
    {
        let alg = declared_algorithm(token)?;
        if !matches!(alg.parse::<Algorithm>(), Ok(a) if HMAC_ALGORITHMS.contains(&a)) {
            return Err(TokenError::UnsupportedAlgorithm(alg));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        let data = jsonwebtoken::decode::<C>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
                ErrorKind::InvalidAlgorithm => TokenError::UnsupportedAlgorithm(alg.clone()),
                _ => TokenError::MalformedToken,
            },
        )?;

        if data.claims.expires_at() < now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

/// Read the `alg` header field of a compact token without verifying anything.
fn declared_algorithm(token: &str) -> Result<String, TokenError> {
    let mut parts = token.split('.');
    let (Some(header), Some(_), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::MalformedToken);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| TokenError::MalformedToken)?;
    let raw: RawHeader = serde_json::from_slice(&bytes).map_err(|_| TokenError::MalformedToken)?;
    Ok(raw.alg)
}
