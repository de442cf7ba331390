//! Request-terminal error taxonomy.
//!
//! Every variant maps to exactly one status code and is final for the current
//! request; nothing here is retried. Unexpected lower-level failures are
//! wrapped in [`ApiError::Internal`], logged with full context, and surfaced
//! as a generic message so internals never leak to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Registration with an email already on file.
    #[error("Email already exists")]
    DuplicateIdentity,
    /// Unknown email or wrong password. The message is deliberately uniform
    /// for both cases so callers cannot enumerate accounts.
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// Malformed, expired, or wrong-kind token presented to refresh.
    #[error("Invalid refresh token")]
    InvalidToken,
    /// Cryptographically valid refresh token superseded by a later rotation.
    #[error("Refresh token revoked")]
    RevokedToken,
    #[error("Too many requests. Please slow down before retrying.")]
    Throttled,
    #[error("{0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("{0}")]
    Validation(String),
    #[error("Internal server error")]
    Internal(anyhow::Error),
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::DuplicateIdentity | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials
            | Self::InvalidToken
            | Self::RevokedToken
            | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Throttled => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateIdentity => "duplicate_identity",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidToken => "invalid_token",
            Self::RevokedToken => "revoked_token",
            Self::Throttled => "throttled",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::Validation(_) => "validation",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            error!("Internal error: {err:#}");
        }

        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("Resource not found".to_string()),
            StoreError::Conflict => Self::DuplicateIdentity,
        }
    }
}
