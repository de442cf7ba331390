//! Task management on top of the task store.
//!
//! Status changes are pushed to the external work queue and every mutation
//! records a telemetry event; both are fire-and-forget and never fail the
//! operation itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::UserProfile;
use crate::errors::ApiError;
use crate::events::EventSink;
use crate::store::{
    AccountStore, Page, StatusQueue, StatusUpdate, StoreError, Task, TaskPriority, TaskQuery,
    TaskStatistics, TaskStatus, TaskStore,
};

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub user_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub user_id: Option<Option<Uuid>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BatchAction {
    Complete,
    Delete,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct BatchOutcome {
    pub action: BatchAction,
    pub updated: u64,
    pub deleted: u64,
}

/// Task joined with its owning user, for listings that ask for it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

pub struct TaskService {
    tasks: Arc<dyn TaskStore>,
    accounts: Arc<dyn AccountStore>,
    queue: Arc<dyn StatusQueue>,
    events: Arc<dyn EventSink>,
}

impl TaskService {
    #[must_use]
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        accounts: Arc<dyn AccountStore>,
        queue: Arc<dyn StatusQueue>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            tasks,
            accounts,
            queue,
            events,
        }
    }

    pub async fn create(&self, new_task: NewTask) -> Result<Task, ApiError> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: new_task.title,
            description: new_task.description,
            status: new_task.status.unwrap_or(TaskStatus::Pending),
            priority: new_task.priority.unwrap_or(TaskPriority::Medium),
            user_id: new_task.user_id,
            due_date: new_task.due_date,
            created_at: now,
            updated_at: now,
        };

        let task = self.tasks.create(task).await.map_err(store_internal)?;
        self.enqueue(&[(task.id, task.status)]).await;
        self.events
            .record("task.created", json!({ "taskId": task.id }));
        Ok(task)
    }

    pub async fn list(
        &self,
        query: &TaskQuery,
        include_user: bool,
    ) -> Result<Page<TaskDetail>, ApiError> {
        let page = self.tasks.list(query).await.map_err(store_internal)?;
        let meta = page.meta;
        let mut data = Vec::with_capacity(page.data.len());
        for task in page.data {
            data.push(self.with_user(task, include_user).await?);
        }
        Ok(Page { data, meta })
    }

    pub async fn get(&self, id: Uuid) -> Result<TaskDetail, ApiError> {
        let task = self
            .tasks
            .find_by_id(id)
            .await
            .map_err(store_internal)?
            .ok_or_else(|| not_found(id))?;
        self.with_user(task, true).await
    }

    pub async fn update(&self, id: Uuid, patch: TaskPatch) -> Result<Task, ApiError> {
        let mut task = self
            .tasks
            .find_by_id(id)
            .await
            .map_err(store_internal)?
            .ok_or_else(|| not_found(id))?;

        let previous_status = task.status;
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(user_id) = patch.user_id {
            task.user_id = user_id;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }

        let task = match self.tasks.update(task).await {
            Ok(task) => task,
            Err(StoreError::NotFound) => return Err(not_found(id)),
            Err(err) => return Err(store_internal(err)),
        };

        if previous_status != task.status {
            self.enqueue(&[(task.id, task.status)]).await;
        }
        self.events.record(
            "task.updated",
            json!({
                "taskId": task.id,
                "previousStatus": previous_status,
                "newStatus": task.status,
            }),
        );
        Ok(task)
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), ApiError> {
        match self.tasks.delete(id).await {
            Ok(()) => {
                self.events.record("task.deleted", json!({ "taskId": id }));
                Ok(())
            }
            Err(StoreError::NotFound) => Err(not_found(id)),
            Err(err) => Err(store_internal(err)),
        }
    }

    pub async fn statistics(&self) -> Result<TaskStatistics, ApiError> {
        self.tasks.statistics().await.map_err(store_internal)
    }

    /// Apply one action to a set of tasks. Duplicate ids collapse to one.
    pub async fn batch(
        &self,
        action: BatchAction,
        task_ids: &[Uuid],
    ) -> Result<BatchOutcome, ApiError> {
        let unique: Vec<Uuid> = {
            let mut seen = HashSet::new();
            task_ids
                .iter()
                .copied()
                .filter(|id| seen.insert(*id))
                .collect()
        };

        if unique.is_empty() {
            return Ok(BatchOutcome {
                action,
                updated: 0,
                deleted: 0,
            });
        }

        match action {
            BatchAction::Complete => {
                let updated = self
                    .tasks
                    .set_status_many(&unique, TaskStatus::Completed)
                    .await
                    .map_err(store_internal)?;
                let notifications: Vec<(Uuid, TaskStatus)> = updated
                    .iter()
                    .map(|id| (*id, TaskStatus::Completed))
                    .collect();
                self.enqueue(&notifications).await;
                self.events.record(
                    "task.batch",
                    json!({ "action": action, "updated": updated.len() }),
                );
                Ok(BatchOutcome {
                    action,
                    updated: updated.len() as u64,
                    deleted: 0,
                })
            }
            BatchAction::Delete => {
                let deleted = self
                    .tasks
                    .delete_many(&unique)
                    .await
                    .map_err(store_internal)?;
                self.events
                    .record("task.batch", json!({ "action": action, "deleted": deleted }));
                Ok(BatchOutcome {
                    action,
                    updated: 0,
                    deleted,
                })
            }
        }
    }

    async fn with_user(&self, task: Task, include_user: bool) -> Result<TaskDetail, ApiError> {
        let user = match (include_user, task.user_id) {
            (true, Some(user_id)) => self
                .accounts
                .find_by_id(user_id)
                .await
                .map_err(store_internal)?
                .map(|account| UserProfile::from(&account)),
            _ => None,
        };
        Ok(TaskDetail { task, user })
    }

    async fn enqueue(&self, updates: &[(Uuid, TaskStatus)]) {
        for (task_id, status) in updates {
            self.queue
                .enqueue_status_update(StatusUpdate {
                    task_id: *task_id,
                    status: *status,
                })
                .await;
        }
    }
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Task with ID {id} not found"))
}

fn store_internal(err: StoreError) -> ApiError {
    ApiError::Internal(anyhow::anyhow!("task store failure: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use crate::store::memory::{MemoryAccountStore, MemoryStatusQueue, MemoryTaskStore};

    fn service() -> (TaskService, Arc<MemoryStatusQueue>, Arc<CollectingEventSink>) {
        let queue = Arc::new(MemoryStatusQueue::new());
        let events = Arc::new(CollectingEventSink::new());
        let service = TaskService::new(
            Arc::new(MemoryTaskStore::new()),
            Arc::new(MemoryAccountStore::new()),
            queue.clone(),
            events.clone(),
        );
        (service, queue, events)
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            status: None,
            priority: None,
            user_id: None,
            due_date: None,
        }
    }

    #[tokio::test]
    async fn create_enqueues_initial_status() {
        let (service, queue, events) = service();
        let task = match service.create(new_task("write docs")).await {
            Ok(task) => task,
            Err(err) => panic!("create failed: {err}"),
        };

        assert_eq!(task.status, TaskStatus::Pending);
        let updates = queue.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].task_id, task.id);
        assert_eq!(events.names(), vec!["task.created"]);
    }

    #[tokio::test]
    async fn status_change_is_enqueued_but_other_updates_are_not() {
        let (service, queue, _events) = service();
        let task = match service.create(new_task("triage")).await {
            Ok(task) => task,
            Err(err) => panic!("create failed: {err}"),
        };
        queue.drain();

        // Title-only update: no queue traffic.
        let patch = TaskPatch {
            title: Some("triage inbox".to_string()),
            ..TaskPatch::default()
        };
        let updated = service.update(task.id, patch).await;
        assert!(updated.is_ok());
        assert!(queue.drain().is_empty());

        // Status change: one notification.
        let patch = TaskPatch {
            status: Some(TaskStatus::InProgress),
            ..TaskPatch::default()
        };
        let updated = service.update(task.id, patch).await;
        assert!(updated.is_ok());
        let updates = queue.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn batch_complete_deduplicates_ids() {
        let (service, queue, _events) = service();
        let task = match service.create(new_task("dedupe")).await {
            Ok(task) => task,
            Err(err) => panic!("create failed: {err}"),
        };
        queue.drain();

        let outcome = service
            .batch(BatchAction::Complete, &[task.id, task.id, task.id])
            .await;
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => panic!("batch failed: {err}"),
        };
        assert_eq!(outcome.updated, 1);
        assert_eq!(queue.drain().len(), 1);
    }

    #[tokio::test]
    async fn batch_delete_reports_missing_ids() {
        let (service, _queue, _events) = service();
        let task = match service.create(new_task("gone soon")).await {
            Ok(task) => task,
            Err(err) => panic!("create failed: {err}"),
        };

        let outcome = service
            .batch(BatchAction::Delete, &[task.id, Uuid::new_v4()])
            .await;
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => panic!("batch failed: {err}"),
        };
        assert_eq!(outcome.deleted, 1);
    }

    #[tokio::test]
    async fn missing_task_is_not_found() {
        let (service, _queue, _events) = service();
        assert!(matches!(
            service.get(Uuid::new_v4()).await,
            Err(ApiError::NotFound(_))
        ));
    }
}
