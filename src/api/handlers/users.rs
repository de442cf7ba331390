//! User administration endpoints. Every route here requires the admin role
//! and shares one per-admin rate bucket across operations.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{admit, valid_email};
use crate::api::AppState;
use crate::auth::{credentials, Principal};
use crate::errors::ApiError;
use crate::store::{Account, AccountQuery, Page, Role, SortDirection, StoreError};

const MIN_PASSWORD_CHARS: usize = 8;
const ADMIN_SCOPE: &str = "users.admin";

/// Full account projection for administrators; never includes hashes.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for UserDetail {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            name: account.name.clone(),
            role: account.role,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct UserFilterQuery {
    pub role: Option<Role>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<SortDirection>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn gate(state: &AppState, principal: &Principal) -> Result<(), ApiError> {
    principal.require_role(Role::Admin)?;
    admit(
        state,
        ADMIN_SCOPE,
        "admin",
        Some(principal.id),
        state.policies.user_admin,
    )
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("User with ID {id} not found"))
}

#[utoipa::path(
    get,
    path = "/users",
    params(UserFilterQuery),
    responses(
        (status = 200, description = "Paginated accounts"),
        (status = 403, description = "Caller is not an administrator")
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(filter): Query<UserFilterQuery>,
) -> Result<Json<Page<UserDetail>>, ApiError> {
    gate(&state, &principal)?;

    let query = AccountQuery {
        role: filter.role,
        search: filter.search,
        sort_by: filter.sort_by,
        sort_direction: filter.sort_direction,
        page: filter.page,
        limit: filter.limit,
    };
    let page = state
        .accounts
        .list(&query)
        .await
        .map_err(store_internal)?;

    Ok(Json(Page {
        data: page.data.iter().map(UserDetail::from).collect(),
        meta: page.meta,
    }))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = UserDetail),
        (status = 400, description = "Invalid payload or email already exists"),
        (status = 403, description = "Caller is not an administrator")
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserDetail>), ApiError> {
    gate(&state, &principal)?;

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

    let mut account = Account::new(
        payload.email,
        payload.name,
        credentials::hash_secret(&payload.password)?,
    );
    if let Some(role) = payload.role {
        account.role = role;
    }

    match state.accounts.create(account).await {
        Ok(account) => Ok((StatusCode::CREATED, Json(UserDetail::from(&account)))),
        Err(StoreError::Conflict) => Err(ApiError::DuplicateIdentity),
        Err(err) => Err(store_internal(err)),
    }
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    responses(
        (status = 200, description = "Account found", body = UserDetail),
        (status = 404, description = "No such account")
    ),
    tag = "users"
)]
#[instrument(skip_all, fields(%id))]
pub async fn get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDetail>, ApiError> {
    gate(&state, &principal)?;

    let account = state
        .accounts
        .find_by_id(id)
        .await
        .map_err(store_internal)?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(UserDetail::from(&account)))
}

#[utoipa::path(
    patch,
    path = "/users/{id}",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Account updated", body = UserDetail),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "No such account")
    ),
    tag = "users"
)]
#[instrument(skip_all, fields(%id))]
pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserDetail>, ApiError> {
    gate(&state, &principal)?;

    let mut account = state
        .accounts
        .find_by_id(id)
        .await
        .map_err(store_internal)?
        .ok_or_else(|| not_found(id))?;

    if let Some(email) = payload.email {
        if !valid_email(&email) {
            return Err(ApiError::Validation("email must be a valid address".into()));
        }
        account.email = email;
    }
    if let Some(password) = payload.password {
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ApiError::Validation(format!(
                "password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }
        account.password_hash = credentials::hash_secret(&password)?;
    }
    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("name must not be empty".into()));
        }
        account.name = name;
    }
    if let Some(role) = payload.role {
        account.role = role;
    }

    match state.accounts.update(account).await {
        Ok(account) => Ok(Json(UserDetail::from(&account))),
        Err(StoreError::NotFound) => Err(not_found(id)),
        Err(StoreError::Conflict) => Err(ApiError::DuplicateIdentity),
    }
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    responses(
        (status = 204, description = "Account deleted"),
        (status = 404, description = "No such account")
    ),
    tag = "users"
)]
#[instrument(skip_all, fields(%id))]
pub async fn remove(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    gate(&state, &principal)?;

    match state.accounts.delete(id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(StoreError::NotFound) => Err(not_found(id)),
        Err(err) => Err(store_internal(err)),
    }
}

fn store_internal(err: StoreError) -> ApiError {
    ApiError::Internal(anyhow::anyhow!("account store failure: {err}"))
}
