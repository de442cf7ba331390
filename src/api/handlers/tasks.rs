//! Task endpoints for any authenticated caller.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::api::AppState;
use crate::errors::ApiError;
use crate::store::{Page, SortDirection, Task, TaskPriority, TaskQuery, TaskStatistics, TaskStatus};
use crate::tasks::{BatchAction, BatchOutcome, NewTask, TaskDetail, TaskPatch};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub user_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Absent fields stay untouched; there is no way to clear a field here.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub user_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilterQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub user_id: Option<Uuid>,
    pub due_date_from: Option<DateTime<Utc>>,
    pub due_date_to: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<SortDirection>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub include_user: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchRequest {
    pub action: BatchAction,
    pub tasks: Vec<Uuid>,
}

#[utoipa::path(
    post,
    path = "/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Invalid payload")
    ),
    tag = "tasks"
)]
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty".into()));
    }

    let task = state
        .tasks
        .create(NewTask {
            title: payload.title,
            description: payload.description,
            status: payload.status,
            priority: payload.priority,
            user_id: payload.user_id,
            due_date: payload.due_date,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/tasks",
    params(TaskFilterQuery),
    responses(
        (status = 200, description = "Paginated tasks")
    ),
    tag = "tasks"
)]
#[instrument(skip_all)]
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<TaskFilterQuery>,
) -> Result<Json<Page<TaskDetail>>, ApiError> {
    let include_user = filter.include_user.unwrap_or(true);
    let query = TaskQuery {
        status: filter.status,
        priority: filter.priority,
        user_id: filter.user_id,
        due_date_from: filter.due_date_from,
        due_date_to: filter.due_date_to,
        search: filter.search,
        sort_by: filter.sort_by,
        sort_direction: filter.sort_direction,
        page: filter.page,
        limit: filter.limit,
    };

    let page = state.tasks.list(&query, include_user).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/tasks/statistics",
    responses(
        (status = 200, description = "Aggregate counts", body = TaskStatistics)
    ),
    tag = "tasks"
)]
#[instrument(skip_all)]
pub async fn statistics(
    State(state): State<AppState>,
) -> Result<Json<TaskStatistics>, ApiError> {
    let statistics = state.tasks.statistics().await?;
    Ok(Json(statistics))
}

#[utoipa::path(
    post,
    path = "/tasks/batch",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "Batch applied", body = BatchOutcome),
        (status = 400, description = "Empty task list")
    ),
    tag = "tasks"
)]
#[instrument(skip_all)]
pub async fn batch(
    State(state): State<AppState>,
    Json(payload): Json<BatchRequest>,
) -> Result<Json<BatchOutcome>, ApiError> {
    if payload.tasks.is_empty() {
        return Err(ApiError::Validation("tasks must not be empty".into()));
    }

    let outcome = state.tasks.batch(payload.action, &payload.tasks).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/tasks/{id}",
    responses(
        (status = 200, description = "Task found", body = TaskDetail),
        (status = 404, description = "No such task")
    ),
    tag = "tasks"
)]
#[instrument(skip_all, fields(%id))]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskDetail>, ApiError> {
    let detail = state.tasks.get(id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    patch,
    path = "/tasks/{id}",
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 404, description = "No such task")
    ),
    tag = "tasks"
)]
#[instrument(skip_all, fields(%id))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    if let Some(title) = &payload.title {
        if title.trim().is_empty() {
            return Err(ApiError::Validation("title must not be empty".into()));
        }
    }

    let patch = TaskPatch {
        title: payload.title,
        description: payload.description.map(Some),
        status: payload.status,
        priority: payload.priority,
        user_id: payload.user_id.map(Some),
        due_date: payload.due_date.map(Some),
    };
    let task = state.tasks.update(id, patch).await?;
    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "No such task")
    ),
    tag = "tasks"
)]
#[instrument(skip_all, fields(%id))]
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.tasks.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
