use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::api::AppState;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    name: String,
    version: String,
    status: String,
    database: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Account store is reachable", body = [Health]),
        (status = 503, description = "Account store is unreachable", body = [Health])
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.accounts.ping().await {
        Ok(()) => Ok(()),
        Err(error) => {
            error!("Failed to ping account store: {}", error);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    let health = Health {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: if database.is_ok() {
            "healthy".to_string()
        } else {
            "unhealthy".to_string()
        },
        database: if database.is_ok() {
            "ok".to_string()
        } else {
            "down".to_string()
        },
    };

    match database {
        Ok(()) => (StatusCode::OK, Json(health)),
        Err(status) => (status, Json(health)),
    }
}
