//! In-memory store (non-persistent).

use super::{NewTask, Task, TaskFilter, TaskPatch, TaskStore, User, UserStore};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<i64, User>>>,
    tasks: Arc<RwLock<HashMap<i64, Task>>>,
    next_user_id: Arc<AtomicI64>,
    next_task_id: Arc<AtomicI64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            tasks: Arc::new(RwLock::new(HashMap::new())),
            next_user_id: Arc::new(AtomicI64::new(1)),
            next_task_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User> {
        let mut users = self.users.write().await;

        // Email first, then username, matching the registration contract.
        if users.values().any(|u| u.email == email) {
            return Err(Error::Conflict(
                "User with this email already exists".to_string(),
            ));
        }
        if users.values().any(|u| u.username == username) {
            return Err(Error::Conflict("Username is already taken".to_string()));
        }

        let user = User {
            id: self.next_user_id.fetch_add(1, Ordering::SeqCst),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn insert_task(&self, owner_id: i64, draft: NewTask) -> Result<Task> {
        // Emulates the SQLite foreign key from tasks to users.
        if !self.users.read().await.contains_key(&owner_id) {
            return Err(Error::Storage(format!(
                "task owner {} does not exist",
                owner_id
            )));
        }

        let now = Utc::now();
        let task = Task {
            id: self.next_task_id.fetch_add(1, Ordering::SeqCst),
            title: draft.title,
            description: draft.description,
            completed: false,
            priority: draft.priority.unwrap_or_default(),
            due_date: draft.due_date,
            user_id: owner_id,
            created_at: now,
            updated_at: now,
        };
        self.tasks.write().await.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: i64, owner_id: i64) -> Result<Option<Task>> {
        Ok(self
            .tasks
            .read()
            .await
            .get(&id)
            .filter(|t| t.user_id == owner_id)
            .cloned())
    }

    async fn list_tasks(&self, owner_id: i64, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.user_id == owner_id)
            .filter(|t| filter.completed.map(|c| t.completed == c).unwrap_or(true))
            .filter(|t| filter.priority.map(|p| t.priority == p).unwrap_or(true))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.id);
        Ok(tasks)
    }

    async fn update_task(
        &self,
        id: i64,
        owner_id: i64,
        patch: TaskPatch,
    ) -> Result<Option<Task>> {
        // The write guard spans the ownership check and the mutation, so a
        // concurrent delete cannot interleave.
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(&id).filter(|t| t.user_id == owner_id) else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        task.updated_at = Utc::now();

        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: i64, owner_id: i64) -> Result<bool> {
        let mut tasks = self.tasks.write().await;
        match tasks.get(&id) {
            Some(task) if task.user_id == owner_id => {
                tasks.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
