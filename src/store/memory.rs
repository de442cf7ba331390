//! In-memory store implementations.
//!
//! Single-node backing for tests and small deployments. Each store keeps its
//! records behind one `RwLock`; the refresh-hash swap takes the write lock for
//! the whole read-modify-write, which is what makes it a real compare-and-swap.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    Account, AccountQuery, AccountStore, Page, PageRequest, SortDirection, StatusQueue,
    StatusUpdate, StoreError, Task, TaskQuery, TaskStatistics, TaskStatus, TaskStore,
};

#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id).cloned())
    }

    async fn create(&self, account: Account) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::Conflict);
        }
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn list(&self, query: &AccountQuery) -> Result<Page<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        let search = query.search.as_ref().map(|s| s.to_lowercase());

        let mut matches: Vec<Account> = accounts
            .values()
            .filter(|a| query.role.map_or(true, |role| a.role == role))
            .filter(|a| {
                search.as_ref().map_or(true, |needle| {
                    a.name.to_lowercase().contains(needle)
                        || a.email.to_lowercase().contains(needle)
                })
            })
            .cloned()
            .collect();

        sort_records(
            &mut matches,
            query.sort_by.as_deref(),
            query.sort_direction,
            |a, b, field| match field {
                "name" => a.name.cmp(&b.name),
                "updatedAt" => a.updated_at.cmp(&b.updated_at),
                _ => a.created_at.cmp(&b.created_at),
            },
        );

        Ok(PageRequest::normalize(query.page, query.limit).paginate(matches))
    }

    async fn update(&self, mut account: Account) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;
        if !accounts.contains_key(&account.id) {
            return Err(StoreError::NotFound);
        }
        // Emails stay unique across accounts, not just at creation.
        if accounts
            .values()
            .any(|a| a.id != account.id && a.email == account.email)
        {
            return Err(StoreError::Conflict);
        }
        account.updated_at = chrono::Utc::now();
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        accounts.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn set_refresh_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        account.current_refresh_hash = Some(hash.to_string());
        account.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn swap_refresh_hash(
        &self,
        id: Uuid,
        expected: Option<&str>,
        new_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        if account.current_refresh_hash.as_deref() != expected {
            return Ok(false);
        }
        account.current_refresh_hash = Some(new_hash.to_string());
        account.updated_at = chrono::Utc::now();
        Ok(true)
    }
}

#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl MemoryTaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, task: Task) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(&id).cloned())
    }

    async fn list(&self, query: &TaskQuery) -> Result<Page<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        let search = query.search.as_ref().map(|s| s.to_lowercase());

        let mut matches: Vec<Task> = tasks
            .values()
            .filter(|t| query.status.map_or(true, |status| t.status == status))
            .filter(|t| query.priority.map_or(true, |priority| t.priority == priority))
            .filter(|t| query.user_id.map_or(true, |user| t.user_id == Some(user)))
            .filter(|t| {
                query
                    .due_date_from
                    .map_or(true, |from| t.due_date.is_some_and(|due| due >= from))
            })
            .filter(|t| {
                query
                    .due_date_to
                    .map_or(true, |to| t.due_date.is_some_and(|due| due <= to))
            })
            .filter(|t| {
                search.as_ref().map_or(true, |needle| {
                    t.title.to_lowercase().contains(needle)
                        || t.description
                            .as_ref()
                            .is_some_and(|d| d.to_lowercase().contains(needle))
                })
            })
            .cloned()
            .collect();

        sort_records(
            &mut matches,
            query.sort_by.as_deref(),
            query.sort_direction,
            |a, b, field| match field {
                "title" => a.title.cmp(&b.title),
                "dueDate" => a.due_date.cmp(&b.due_date),
                "updatedAt" => a.updated_at.cmp(&b.updated_at),
                _ => a.created_at.cmp(&b.created_at),
            },
        );

        Ok(PageRequest::normalize(query.page, query.limit).paginate(matches))
    }

    async fn update(&self, mut task: Task) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        if !tasks.contains_key(&task.id) {
            return Err(StoreError::NotFound);
        }
        task.updated_at = chrono::Utc::now();
        tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        tasks.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, StoreError> {
        let mut tasks = self.tasks.write().await;
        let mut deleted = 0;
        for id in ids {
            if tasks.remove(id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn set_status_many(
        &self,
        ids: &[Uuid],
        status: TaskStatus,
    ) -> Result<Vec<Uuid>, StoreError> {
        let mut tasks = self.tasks.write().await;
        let mut updated = Vec::new();
        let now = chrono::Utc::now();
        for id in ids {
            if let Some(task) = tasks.get_mut(id) {
                task.status = status;
                task.updated_at = now;
                updated.push(*id);
            }
        }
        Ok(updated)
    }

    async fn statistics(&self) -> Result<TaskStatistics, StoreError> {
        let tasks = self.tasks.read().await;
        let mut stats = TaskStatistics::default();
        for task in tasks.values() {
            stats.total += 1;
            match task.status {
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Pending => stats.pending += 1,
            }
            if task.priority == super::TaskPriority::High {
                stats.high_priority += 1;
            }
        }
        Ok(stats)
    }
}

fn sort_records<T>(
    records: &mut [T],
    sort_by: Option<&str>,
    direction: Option<SortDirection>,
    compare: impl Fn(&T, &T, &str) -> Ordering,
) {
    let field = sort_by.unwrap_or("createdAt").to_string();
    records.sort_by(|a, b| compare(a, b, &field));
    if direction.unwrap_or(SortDirection::Desc) == SortDirection::Desc {
        records.reverse();
    }
}

/// Queue sink that keeps enqueued notifications in memory. Doubles as the
/// test double for asserting what the core handed to the work queue.
#[derive(Debug, Default)]
pub struct MemoryStatusQueue {
    updates: Mutex<Vec<StatusUpdate>>,
}

impl MemoryStatusQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn drain(&self) -> Vec<StatusUpdate> {
        match self.updates.lock() {
            Ok(mut updates) => updates.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }
}

#[async_trait]
impl StatusQueue for MemoryStatusQueue {
    async fn enqueue_status_update(&self, update: StatusUpdate) {
        debug!(task_id = %update.task_id, status = ?update.status, "enqueue status update");
        match self.updates.lock() {
            Ok(mut updates) => updates.push(update),
            Err(poisoned) => poisoned.into_inner().push(update),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TaskPriority;

    fn account(email: &str) -> Account {
        Account::new(email.to_string(), "Test".to_string(), "hash".to_string())
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let store = MemoryAccountStore::new();
        store
            .create(account("dup@example.com"))
            .await
            .map_err(|_| ())
            .ok();
        let err = store.create(account("dup@example.com")).await;
        assert_eq!(err.err(), Some(StoreError::Conflict));
    }

    #[tokio::test]
    async fn swap_refresh_hash_is_compare_and_swap() {
        let store = MemoryAccountStore::new();
        let created = match store.create(account("cas@example.com")).await {
            Ok(a) => a,
            Err(err) => panic!("create failed: {err}"),
        };

        // No hash yet: swap against None wins, swap against a stale value loses.
        assert_eq!(
            store.swap_refresh_hash(created.id, None, "h1").await,
            Ok(true)
        );
        assert_eq!(
            store.swap_refresh_hash(created.id, None, "h2").await,
            Ok(false)
        );
        assert_eq!(
            store.swap_refresh_hash(created.id, Some("h1"), "h2").await,
            Ok(true)
        );

        let reloaded = store.find_by_id(created.id).await;
        assert_eq!(
            reloaded
                .ok()
                .flatten()
                .and_then(|a| a.current_refresh_hash),
            Some("h2".to_string())
        );
    }

    #[tokio::test]
    async fn update_rejects_email_taken_by_another_account() {
        let store = MemoryAccountStore::new();
        let _ = store.create(account("taken@example.com")).await;
        let other = match store.create(account("mine@example.com")).await {
            Ok(a) => a,
            Err(err) => panic!("create failed: {err}"),
        };

        let mut renamed = other.clone();
        renamed.email = "taken@example.com".to_string();
        assert_eq!(store.update(renamed).await.err(), Some(StoreError::Conflict));

        // Updating without changing the email still works.
        let mut same_email = other;
        same_email.name = "Renamed".to_string();
        assert!(store.update(same_email).await.is_ok());
    }

    #[tokio::test]
    async fn list_filters_and_paginates_tasks() {
        let store = MemoryTaskStore::new();
        for i in 0..3 {
            let mut task = Task {
                id: Uuid::new_v4(),
                title: format!("task {i}"),
                description: None,
                status: TaskStatus::Pending,
                priority: TaskPriority::Medium,
                user_id: None,
                due_date: None,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            };
            if i == 2 {
                task.status = TaskStatus::Completed;
            }
            let _ = store.create(task).await;
        }

        let query = TaskQuery {
            status: Some(TaskStatus::Pending),
            ..TaskQuery::default()
        };
        let page = match store.list(&query).await {
            Ok(page) => page,
            Err(err) => panic!("list failed: {err}"),
        };
        assert_eq!(page.meta.total, 2);
        assert!(page.data.iter().all(|t| t.status == TaskStatus::Pending));
    }

    #[tokio::test]
    async fn statistics_counts_by_status_and_priority() {
        let store = MemoryTaskStore::new();
        let mut task = Task {
            id: Uuid::new_v4(),
            title: "urgent".to_string(),
            description: None,
            status: TaskStatus::InProgress,
            priority: TaskPriority::High,
            user_id: None,
            due_date: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let _ = store.create(task.clone()).await;
        task.id = Uuid::new_v4();
        task.status = TaskStatus::Completed;
        task.priority = TaskPriority::Low;
        let _ = store.create(task).await;

        let stats = match store.statistics().await {
            Ok(stats) => stats,
            Err(err) => panic!("statistics failed: {err}"),
        };
        assert_eq!(stats.total, 2);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.high_priority, 1);
    }
}
