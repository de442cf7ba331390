//! Collaborator interfaces the core depends on.
//!
//! The account and task stores are keyed stores owned by whoever deploys the
//! service; the core only relies on the operations declared here. The bundled
//! [`memory`] implementations back tests and single-node deployments.

pub mod memory;
pub mod models;

pub use models::{
    Account, Role, SortDirection, Task, TaskPriority, TaskStatistics, TaskStatus,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record conflicts with an existing one")]
    Conflict,
}

/// Pagination envelope shared by every listing endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub has_next: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Clamp raw caller input: page is 1-indexed, limit capped at 100.
    #[must_use]
    pub fn normalize(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(25).clamp(1, 100),
        }
    }

    /// Slice an already filtered and sorted result set.
    pub fn paginate<T>(self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let offset = (self.page as usize - 1).saturating_mul(self.limit as usize);
        let data: Vec<T> = items
            .into_iter()
            .skip(offset)
            .take(self.limit as usize)
            .collect();

        Page {
            data,
            meta: PageMeta {
                total,
                page: self.page,
                limit: self.limit,
                has_next: u64::from(self.page) * u64::from(self.limit) < total,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccountQuery {
    pub role: Option<Role>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<SortDirection>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
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
}

/// Keyed account store. One account holds at most one active refresh hash;
/// `swap_refresh_hash` is the atomic compare-and-swap that one-shot rotation
/// relies on.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    /// Exact-match lookup; emails are case-sensitive storage keys.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the email is already on file.
    async fn create(&self, account: Account) -> Result<Account, StoreError>;

    async fn list(&self, query: &AccountQuery) -> Result<Page<Account>, StoreError>;

    async fn update(&self, account: Account) -> Result<Account, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    /// Unconditional overwrite, used by login and register where the previous
    /// session (if any) is invalidated by design.
    async fn set_refresh_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError>;

    /// Atomic compare-and-swap on `current_refresh_hash`. Returns `false`
    /// when the stored hash no longer matches `expected`, i.e. a concurrent
    /// rotation won the race.
    async fn swap_refresh_hash(
        &self,
        id: Uuid,
        expected: Option<&str>,
        new_hash: &str,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, task: Task) -> Result<Task, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    async fn list(&self, query: &TaskQuery) -> Result<Page<Task>, StoreError>;

    async fn update(&self, task: Task) -> Result<Task, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    /// Bulk delete; returns how many rows existed.
    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, StoreError>;

    /// Bulk status update; returns the ids that were actually updated.
    async fn set_status_many(
        &self,
        ids: &[Uuid],
        status: TaskStatus,
    ) -> Result<Vec<Uuid>, StoreError>;

    async fn statistics(&self) -> Result<TaskStatistics, StoreError>;
}

/// Task status change notification handed to the external work queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub task_id: Uuid,
    pub status: TaskStatus,
}

/// Work queue collaborator. Delivery is fire-and-forget from the core's
/// perspective; failures must never fail the surrounding operation.
#[async_trait]
pub trait StatusQueue: Send + Sync {
    async fn enqueue_status_update(&self, update: StatusUpdate);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_input() {
        let req = PageRequest::normalize(None, None);
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, 25);

        let req = PageRequest::normalize(Some(0), Some(1000));
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, 100);
    }

    #[test]
    fn paginate_reports_has_next() {
        let req = PageRequest { page: 1, limit: 2 };
        let page = req.paginate(vec![1, 2, 3]);
        assert_eq!(page.data, vec![1, 2]);
        assert_eq!(page.meta.total, 3);
        assert!(page.meta.has_next);

        let req = PageRequest { page: 2, limit: 2 };
        let page = req.paginate(vec![1, 2, 3]);
        assert_eq!(page.data, vec![3]);
        assert!(!page.meta.has_next);
    }
}
