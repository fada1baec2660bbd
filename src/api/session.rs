//! Login, refresh and logout endpoints.
//!
//! - POST `/authenticate` - Exchange a known email for a token pair
//! - GET `/refresh` - Exchange the refresh cookie for a new token pair
//! - GET `/logout` - Tell the client to drop its refresh cookie

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, error, info};

use super::AppState;
use super::error::ApiError;
use crate::auth::{
    AuthConfig, AuthError, TokenPair, build_expired_cookie, build_refresh_cookie, get_cookie,
    issue,
};
use crate::jwt::RefreshClaims;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct LoginRequest {
    email: String,
}

/// Respond with a token pair in the body and the refresh token as a cookie.
fn token_response(
    status: StatusCode,
    pair: &TokenPair,
    config: &AuthConfig,
    now: DateTime<Utc>,
) -> Result<Response, ApiError> {
    let cookie = build_refresh_cookie(&pair.refresh_token, config, now)
        .to_header_value()
        .map_err(|e| {
            error!(error = %e, "Refresh cookie is not a valid header");
            ApiError::internal("Failed to build cookie")
        })?;

    Ok((status, [(SET_COOKIE, cookie)], Json(pair)).into_response())
}

pub(super) async fn authenticate(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let identity = state
        .db
        .users()
        .lookup_by_email(&request.email)
        .await?
        .ok_or_else(|| {
            debug!("Login attempt for unknown email");
            ApiError::unauthorized("invalid credentials")
        })?;

    let now = Utc::now();
    let pair = issue(&identity, &state.auth, now)?;
    info!(user_id = identity.id, "User logged in");

    token_response(StatusCode::ACCEPTED, &pair, &state.auth, now)
}

pub(super) async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = get_cookie(&headers, &state.auth.cookie_name)
        .ok_or_else(|| ApiError::unauthorized("unauthorized"))?;

    let now = Utc::now();
    let claims: RefreshClaims = state
        .auth
        .signer()
        .verify(token, now)
        .map_err(AuthError::from)?;

    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| ApiError::unauthorized("unknown user"))?;

    let identity = state
        .db
        .users()
        .lookup_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("unknown user"))?;

    let pair = issue(&identity, &state.auth, now)?;
    debug!(user_id, "Refreshed token pair");

    token_response(StatusCode::OK, &pair, &state.auth, now)
}

pub(super) async fn logout(State(state): State<AppState>) -> Result<Response, ApiError> {
    let cookie = build_expired_cookie(&state.auth)
        .to_header_value()
        .map_err(|e| {
            error!(error = %e, "Expired cookie is not a valid header");
            ApiError::internal("Failed to build cookie")
        })?;

    Ok((StatusCode::ACCEPTED, [(SET_COOKIE, cookie)]).into_response())
}
