//! Task operations, scoped to their owner.
//!
//! Every method takes the acting user's id as an explicit parameter; there
//! is no ambient "current user". The owner id travels into the store where
//! it becomes part of the row lookup, so a task owned by someone else and a
//! task that does not exist produce the same `NotFound`.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::store::{NewTask, Task, TaskFilter, TaskPatch, TaskStore};

/// Maximum title length in characters.
const MAX_TITLE_LEN: usize = 200;

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Create a task for the owner. Title must be non-empty and at most
    /// 200 characters; priority defaults to medium, description and due
    /// date to absent.
    pub async fn create(&self, owner_id: i64, draft: NewTask) -> Result<Task> {
        validate_title(&draft.title)?;
        let task = self.store.insert_task(owner_id, draft).await?;
        tracing::debug!("User {} created task {}", owner_id, task.id);
        Ok(task)
    }

    /// Fetch one of the owner's tasks.
    pub async fn get(&self, owner_id: i64, task_id: i64) -> Result<Task> {
        self.store
            .find_task(task_id, owner_id)
            .await?
            .ok_or(Error::NotFound)
    }

    /// List the owner's tasks. Filters are combined by AND; an absent
    /// filter field matches any value (omitting `completed` does not mean
    /// `completed=false`).
    pub async fn list(&self, owner_id: i64, filter: TaskFilter) -> Result<Vec<Task>> {
        self.store.list_tasks(owner_id, &filter).await
    }

    /// Apply a partial update to one of the owner's tasks.
    ///
    /// Absent patch fields are left unchanged; present-as-null clears the
    /// nullable fields. An empty patch is forwarded to the store unchanged
    /// and still refreshes `updated_at`.
    pub async fn update(&self, owner_id: i64, task_id: i64, patch: TaskPatch) -> Result<Task> {
        if let Some(title) = &patch.title {
            validate_title(title)?;
        }
        let task = self
            .store
            .update_task(task_id, owner_id, patch)
            .await?
            .ok_or(Error::NotFound)?;
        tracing::debug!("User {} updated task {}", owner_id, task.id);
        Ok(task)
    }

    /// Delete one of the owner's tasks. Returns whether a task was
    /// removed; false covers both "already gone" and "not yours".
    pub async fn delete(&self, owner_id: i64, task_id: i64) -> Result<bool> {
        let removed = self.store.delete_task(task_id, owner_id).await?;
        if removed {
            tracing::debug!("User {} deleted task {}", owner_id, task_id);
        }
        Ok(removed)
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.is_empty() {
        return Err(Error::Validation("title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::Validation(format!(
            "title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}
