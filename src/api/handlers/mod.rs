//! Route handlers and shared request utilities.

pub mod auth;
pub mod health;
pub mod tasks;
pub mod users;

use axum::extract::ConnectInfo;
use axum::http::HeaderMap;
use regex::Regex;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::admission::{request_key, RatePolicy};
use crate::api::AppState;
use crate::errors::ApiError;

/// Lightweight email sanity check used by auth handlers before persisting data.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Resolve the caller's network origin: first `x-forwarded-for` hop when a
/// proxy added one, otherwise the peer address.
pub fn client_origin(headers: &HeaderMap, addr: Option<&ConnectInfo<SocketAddr>>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| addr.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Run a request through its rate bucket; rejected requests surface as 429.
pub fn admit(
    state: &AppState,
    operation: &str,
    origin: &str,
    account: Option<Uuid>,
    policy: RatePolicy,
) -> Result<(), ApiError> {
    let key = request_key(operation, origin, account);
    match state.buckets.admit(&key, policy) {
        crate::admission::Decision::Admitted => Ok(()),
        crate::admission::Decision::Throttled => Err(ApiError::Throttled),
    }
}
