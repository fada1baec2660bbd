//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::jwt::TokenError;

/// Classified authentication failure.
///
/// Callers branch on the variant: `ExpiredToken` invites a refresh-token
/// exchange, everything else client-side is a terminal 401.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no auth header")]
    NoAuthHeader,
    #[error("invalid auth header")]
    InvalidAuthHeader,
    #[error("malformed token")]
    MalformedToken,
    #[error("unexpected signing method: {0}")]
    UnsupportedAlgorithm(String),
    #[error("token signature is invalid")]
    SignatureMismatch,
    #[error("expired token")]
    ExpiredToken,
    #[error("invalid issuer")]
    InvalidIssuer,
    #[error("failed to sign token")]
    SigningFailed,
    #[error("credential lookup timed out")]
    Timeout,
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::MalformedToken => Self::MalformedToken,
            TokenError::UnsupportedAlgorithm(alg) => Self::UnsupportedAlgorithm(alg),
            TokenError::SignatureMismatch => Self::SignatureMismatch,
            TokenError::Expired => Self::ExpiredToken,
            TokenError::SigningFailed(e) => {
                tracing::error!(error = %e, "Failed to sign token");
                Self::SigningFailed
            }
        }
    }
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NoAuthHeader
            | Self::InvalidAuthHeader
            | Self::MalformedToken
            | Self::UnsupportedAlgorithm(_)
            | Self::SignatureMismatch
            | Self::ExpiredToken
            | Self::InvalidIssuer => StatusCode::UNAUTHORIZED,
            Self::SigningFailed => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Whether the caller may retry with a refresh-token exchange.
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::ExpiredToken)
    }
}

/// JSON error envelope shared by every error response.
#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub error: bool,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                error: true,
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}
