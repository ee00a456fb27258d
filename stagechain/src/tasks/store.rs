//! Task persistence.

use super::task::{Task, TaskStatus};
use crate::errors::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Stores tasks. Tasks are never deleted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a new task.
    async fn create(&self, task: Task) -> Result<Task, StoreError>;

    /// Fetches a task.
    async fn get(&self, id: Uuid) -> Result<Task, StoreError>;

    /// Sets the status of a task.
    async fn update_status(&self, id: Uuid, status: TaskStatus) -> Result<Task, StoreError>;

    /// Writes the terminal status and result of a task.
    async fn complete(&self, id: Uuid, status: TaskStatus, result: String) -> Result<Task, StoreError>;

    /// Returns every task, newest first.
    async fn list(&self) -> Result<Vec<Task>, StoreError>;
}

/// In-memory store for tests and single-process use.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: DashMap<Uuid, (u64, Task)>,
    sequence: AtomicU64,
}

impl InMemoryTaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn modify(&self, id: Uuid, f: impl FnOnce(&mut Task)) -> Result<Task, StoreError> {
        let mut entry = self.tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let task = &mut entry.1;
        f(task);
        task.updated_at = Utc::now();
        Ok(task.clone())
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, task: Task) -> Result<Task, StoreError> {
        use dashmap::mapref::entry::Entry;

        match self.tasks.entry(task.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(task.id)),
            Entry::Vacant(slot) => {
                let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
                slot.insert((seq, task.clone()));
                Ok(task)
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Task, StoreError> {
        self.tasks
            .get(&id)
            .map(|entry| entry.1.clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn update_status(&self, id: Uuid, status: TaskStatus) -> Result<Task, StoreError> {
        self.modify(id, |task| task.status = status)
    }

    async fn complete(&self, id: Uuid, status: TaskStatus, result: String) -> Result<Task, StoreError> {
        self.modify(id, |task| {
            task.status = status;
            task.result = Some(result);
        })
    }

    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let mut entries: Vec<(u64, Task)> =
            self.tasks.iter().map(|entry| entry.value().clone()).collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(entries.into_iter().map(|(_, task)| task).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryTaskStore::new();
        let task = tokio_test::assert_ok!(store.create(Task::new("a")).await);
        assert_eq!(tokio_test::assert_ok!(store.get(task.id).await), task);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_rejected() {
        let store = InMemoryTaskStore::new();
        let task = store.create(Task::new("a")).await.unwrap();
        assert_eq!(
            store.create(task.clone()).await,
            Err(StoreError::Duplicate(task.id))
        );
    }

    #[tokio::test]
    async fn test_missing_task() {
        let store = InMemoryTaskStore::new();
        let id = Uuid::new_v4();
        assert_eq!(store.get(id).await, Err(StoreError::NotFound(id)));
        assert_eq!(
            store.update_status(id, TaskStatus::Processing).await,
            Err(StoreError::NotFound(id))
        );
    }

    #[tokio::test]
    async fn test_complete_writes_status_and_result() {
        let store = InMemoryTaskStore::new();
        let task = store.create(Task::new("a")).await.unwrap();
        store.update_status(task.id, TaskStatus::Processing).await.unwrap();
        let done = store
            .complete(task.id, TaskStatus::Completed, "text".to_string())
            .await
            .unwrap();

        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.result.as_deref(), Some("text"));
        assert!(done.updated_at >= task.updated_at);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = InMemoryTaskStore::new();
        let first = store.create(Task::new("first")).await.unwrap();
        let second = store.create(Task::new("second")).await.unwrap();

        let ids: Vec<Uuid> = store.list().await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
