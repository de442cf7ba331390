//! Session endpoints: register, login and refresh.
//!
//! Each endpoint passes through its rate bucket before touching credentials,
//! keyed by the caller's network origin since no identity exists yet.

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::Deserialize;
use std::net::SocketAddr;
use tracing::instrument;
use utoipa::ToSchema;

use super::{admit, client_origin, valid_email};
use crate::api::AppState;
use crate::auth::AuthResponse;
use crate::errors::ApiError;

const MIN_PASSWORD_CHARS: usize = 8;
const MIN_REFRESH_TOKEN_CHARS: usize = 20;
const MAX_REFRESH_TOKEN_CHARS: usize = 512;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and session issued", body = AuthResponse),
        (status = 400, description = "Invalid payload or email already exists"),
        (status = 429, description = "Too many attempts from this origin")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    addr: Option<ConnectInfo<SocketAddr>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let origin = client_origin(&headers, addr.as_ref());
    admit(
        &state,
        "auth.register",
        &origin,
        None,
        state.policies.register,
    )?;

    if !valid_email(&payload.email) {
        return Err(ApiError::Validation("email must be a valid address".into()));
    }
    if payload.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::Validation(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".into()));
    }

    let response = state
        .sessions
        .register(&payload.email, &payload.password, &payload.name)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many attempts from this origin")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    addr: Option<ConnectInfo<SocketAddr>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let origin = client_origin(&headers, addr.as_ref());
    admit(&state, "auth.login", &origin, None, state.policies.login)?;

    let response = state
        .sessions
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Session rotated", body = AuthResponse),
        (status = 401, description = "Invalid or revoked refresh token"),
        (status = 429, description = "Too many attempts from this origin")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    addr: Option<ConnectInfo<SocketAddr>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let origin = client_origin(&headers, addr.as_ref());
    admit(&state, "auth.refresh", &origin, None, state.policies.refresh)?;

    let length = payload.refresh_token.chars().count();
    if !(MIN_REFRESH_TOKEN_CHARS..=MAX_REFRESH_TOKEN_CHARS).contains(&length) {
        return Err(ApiError::Validation(format!(
            "refreshToken must be between {MIN_REFRESH_TOKEN_CHARS} and {MAX_REFRESH_TOKEN_CHARS} characters"
        )));
    }

    let response = state.sessions.refresh(&payload.refresh_token).await?;
    Ok(Json(response))
}
