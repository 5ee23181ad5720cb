//! Task and user storage with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `sqlite`: SQLite database (the default)
//!
//! Every task operation is owner-scoped: the acting user id is part of the
//! lookup key, and a task owned by someone else is indistinguishable from a
//! task that does not exist.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// A registered user. Internal representation; the credential hash never
/// leaves the accounts layer.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Task priority. Wire form is the lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// A to-do item owned by exactly one user.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Derived, never stored: past due and not yet completed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.map(|d| d < now).unwrap_or(false)
    }
}

/// Fields for a task to be created. Missing priority defaults to medium at
/// the store; completed always starts false.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// A partial update. Each field is independently present or absent:
/// absent means "leave unchanged"; for the nullable fields, present-as-null
/// means "clear". The double `Option` on those fields keeps the two cases
/// distinct through deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

fn double_option<'de, T, D>(de: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

/// Optional list filters, combined by logical AND with the mandatory owner
/// match. An absent field matches any value.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TaskFilter {
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

/// User store trait - implemented by all storage backends.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user if the username and email are both unused.
    ///
    /// Fails with `Error::Conflict` otherwise; the email is checked first.
    async fn insert_user(&self, username: &str, email: &str, password_hash: &str)
        -> Result<User>;

    /// Look up a user by email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// Task store trait - implemented by all storage backends.
///
/// All operations taking a task id also take the acting owner id and match
/// on both.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Insert a task for the given owner. Assigns a fresh id, defaults
    /// completed to false and priority to medium, and stamps
    /// `created_at = updated_at = now`.
    async fn insert_task(&self, owner_id: i64, draft: NewTask) -> Result<Task>;

    /// Owner-scoped point lookup. `None` covers both "absent" and
    /// "owned by someone else".
    async fn find_task(&self, id: i64, owner_id: i64) -> Result<Option<Task>>;

    /// List the owner's tasks matching the filter, in insertion (id) order.
    async fn list_tasks(&self, owner_id: i64, filter: &TaskFilter) -> Result<Vec<Task>>;

    /// Apply a partial update to an owner-scoped task. Only present patch
    /// fields change; `updated_at` is refreshed on every successful call,
    /// including an empty patch. `None` if no row matched id + owner.
    async fn update_task(&self, id: i64, owner_id: i64, patch: TaskPatch)
        -> Result<Option<Task>>;

    /// Delete an owner-scoped task. The boolean reports whether a row was
    /// removed; false is a normal outcome, not an error.
    async fn delete_task(&self, id: i64, owner_id: i64) -> Result<bool>;
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    Memory,
    #[default]
    Sqlite,
}

impl StoreKind {
    /// Parse from environment variable value.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" => Self::Memory,
            "sqlite" | "db" => Self::Sqlite,
            _ => Self::default(),
        }
    }
}

/// Handles to the user and task stores. Both point at the same backend.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub tasks: Arc<dyn TaskStore>,
}

/// Create a store based on kind and configuration.
pub async fn create_store(kind: StoreKind, data_dir: PathBuf) -> Result<Stores> {
    match kind {
        StoreKind::Memory => {
            let store = Arc::new(MemoryStore::new());
            Ok(Stores {
                users: store.clone(),
                tasks: store,
            })
        }
        StoreKind::Sqlite => {
            let store = Arc::new(SqliteStore::new(data_dir).await?);
            Ok(Stores {
                users: store.clone(),
                tasks: store,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    async fn store_with_user() -> (MemoryStore, i64) {
        let store = MemoryStore::new();
        let user = store
            .insert_user("testuser", "test@example.com", "hash")
            .await
            .expect("Failed to insert user");
        (store, user.id)
    }

    fn draft(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            priority: None,
            due_date: None,
        }
    }

    #[tokio::test]
    async fn test_insert_task_applies_defaults() {
        let (store, owner) = store_with_user().await;

        let task = store
            .insert_task(owner, draft("Buy milk"))
            .await
            .expect("Failed to insert task");

        assert!(!task.completed, "New tasks must start incomplete");
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.description, None);
        assert_eq!(task.due_date, None);
        assert_eq!(task.user_id, owner);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[tokio::test]
    async fn test_insert_task_keeps_supplied_priority() {
        let (store, owner) = store_with_user().await;

        let task = store
            .insert_task(
                owner,
                NewTask {
                    title: "Ship release".to_string(),
                    description: Some("before friday".to_string()),
                    priority: Some(Priority::High),
                    due_date: None,
                },
            )
            .await
            .expect("Failed to insert task");

        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.description.as_deref(), Some("before friday"));
    }

    #[tokio::test]
    async fn test_insert_task_unknown_owner_rejected() {
        let store = MemoryStore::new();
        let result = store.insert_task(42, draft("orphan")).await;
        assert!(result.is_err(), "Tasks must reference an existing user");
    }

    #[tokio::test]
    async fn test_find_task_is_owner_scoped() {
        let (store, owner) = store_with_user().await;
        let other = store
            .insert_user("otheruser", "other@example.com", "hash")
            .await
            .expect("Failed to insert user")
            .id;

        let task = store
            .insert_task(owner, draft("Private"))
            .await
            .expect("Failed to insert task");

        let found = store
            .find_task(task.id, owner)
            .await
            .expect("Lookup failed");
        assert!(found.is_some());

        // Not-owned and nonexistent must be indistinguishable.
        let not_owned = store
            .find_task(task.id, other)
            .await
            .expect("Lookup failed");
        let missing = store
            .find_task(task.id + 999, owner)
            .await
            .expect("Lookup failed");
        assert!(not_owned.is_none());
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_list_tasks_filter_composition() {
        let (store, owner) = store_with_user().await;

        for (title, priority, completed) in [
            ("a", Priority::High, false),
            ("b", Priority::Medium, true),
            ("c", Priority::High, true),
        ] {
            let task = store
                .insert_task(
                    owner,
                    NewTask {
                        title: title.to_string(),
                        description: None,
                        priority: Some(priority),
                        due_date: None,
                    },
                )
                .await
                .expect("Failed to insert task");
            if completed {
                store
                    .update_task(
                        task.id,
                        owner,
                        TaskPatch {
                            completed: Some(true),
                            ..Default::default()
                        },
                    )
                    .await
                    .expect("Failed to update task");
            }
        }

        let all = store
            .list_tasks(owner, &TaskFilter::default())
            .await
            .expect("List failed");
        assert_eq!(all.len(), 3);

        let completed = store
            .list_tasks(
                owner,
                &TaskFilter {
                    completed: Some(true),
                    priority: None,
                },
            )
            .await
            .expect("List failed");
        assert_eq!(completed.len(), 2);
        assert!(completed.iter().all(|t| t.completed));

        // Omitting `completed` must not imply completed=false.
        let high = store
            .list_tasks(
                owner,
                &TaskFilter {
                    completed: None,
                    priority: Some(Priority::High),
                },
            )
            .await
            .expect("List failed");
        assert_eq!(high.len(), 2);

        let both = store
            .list_tasks(
                owner,
                &TaskFilter {
                    completed: Some(true),
                    priority: Some(Priority::High),
                },
            )
            .await
            .expect("List failed");
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].title, "c");
    }

    #[tokio::test]
    async fn test_list_tasks_insertion_order() {
        let (store, owner) = store_with_user().await;
        for title in ["first", "second", "third"] {
            store
                .insert_task(owner, draft(title))
                .await
                .expect("Failed to insert task");
        }

        let tasks = store
            .list_tasks(owner, &TaskFilter::default())
            .await
            .expect("List failed");
        let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_update_task_applies_only_present_fields() {
        let (store, owner) = store_with_user().await;
        let task = store
            .insert_task(
                owner,
                NewTask {
                    title: "Original".to_string(),
                    description: Some("keep me".to_string()),
                    priority: Some(Priority::Low),
                    due_date: None,
                },
            )
            .await
            .expect("Failed to insert task");

        let updated = store
            .update_task(
                task.id,
                owner,
                TaskPatch {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("Update failed")
            .expect("Task not found");

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.description.as_deref(), Some("keep me"));
        assert_eq!(updated.priority, Priority::Low);
        assert!(!updated.completed);
    }

    #[tokio::test]
    async fn test_update_task_present_null_clears_field() {
        let (store, owner) = store_with_user().await;
        let task = store
            .insert_task(
                owner,
                NewTask {
                    title: "Has description".to_string(),
                    description: Some("to be cleared".to_string()),
                    priority: None,
                    due_date: Some(Utc::now()),
                },
            )
            .await
            .expect("Failed to insert task");

        let updated = store
            .update_task(
                task.id,
                owner,
                TaskPatch {
                    description: Some(None),
                    due_date: Some(None),
                    ..Default::default()
                },
            )
            .await
            .expect("Update failed")
            .expect("Task not found");

        assert_eq!(updated.description, None);
        assert_eq!(updated.due_date, None);
        assert_eq!(updated.title, "Has description");
    }

    #[tokio::test]
    async fn test_update_task_empty_patch_bumps_updated_at() {
        let (store, owner) = store_with_user().await;
        let task = store
            .insert_task(owner, draft("Untouched"))
            .await
            .expect("Failed to insert task");

        let updated = store
            .update_task(task.id, owner, TaskPatch::default())
            .await
            .expect("Update failed")
            .expect("Task not found");

        assert!(updated.updated_at > task.updated_at);
        assert_eq!(updated.title, task.title);
        assert_eq!(updated.created_at, task.created_at);
    }

    #[tokio::test]
    async fn test_update_task_owner_scoped() {
        let (store, owner) = store_with_user().await;
        let other = store
            .insert_user("otheruser", "other@example.com", "hash")
            .await
            .expect("Failed to insert user")
            .id;
        let task = store
            .insert_task(owner, draft("Mine"))
            .await
            .expect("Failed to insert task");

        let result = store
            .update_task(
                task.id,
                other,
                TaskPatch {
                    title: Some("Hijacked".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("Update failed");
        assert!(result.is_none());

        // The owner's row is untouched.
        let unchanged = store
            .find_task(task.id, owner)
            .await
            .expect("Lookup failed")
            .expect("Task not found");
        assert_eq!(unchanged.title, "Mine");
        assert_eq!(unchanged.updated_at, task.updated_at);
    }

    #[tokio::test]
    async fn test_delete_task_reports_outcome() {
        let (store, owner) = store_with_user().await;
        let other = store
            .insert_user("otheruser", "other@example.com", "hash")
            .await
            .expect("Failed to insert user")
            .id;
        let task = store
            .insert_task(owner, draft("Doomed"))
            .await
            .expect("Failed to insert task");

        // Not-owned delete removes nothing.
        assert!(!store
            .delete_task(task.id, other)
            .await
            .expect("Delete failed"));

        assert!(store
            .delete_task(task.id, owner)
            .await
            .expect("Delete failed"));

        // Second delete is a normal false, not an error.
        assert!(!store
            .delete_task(task.id, owner)
            .await
            .expect("Delete failed"));
    }

    #[tokio::test]
    async fn test_insert_user_conflicts() {
        let store = MemoryStore::new();
        store
            .insert_user("alice", "alice@example.com", "hash")
            .await
            .expect("Failed to insert user");

        let email_taken = store
            .insert_user("alice2", "alice@example.com", "hash")
            .await;
        assert!(matches!(email_taken, Err(Error::Conflict(_))));

        let username_taken = store
            .insert_user("alice", "alice2@example.com", "hash")
            .await;
        assert!(matches!(username_taken, Err(Error::Conflict(_))));

        // The original account is intact.
        let user = store
            .find_user_by_email("alice@example.com")
            .await
            .expect("Lookup failed")
            .expect("User not found");
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn test_store_kind_from_str() {
        assert_eq!(StoreKind::from_str("memory"), StoreKind::Memory);
        assert_eq!(StoreKind::from_str("sqlite"), StoreKind::Sqlite);
        assert_eq!(StoreKind::from_str("db"), StoreKind::Sqlite);
        assert_eq!(StoreKind::from_str("bogus"), StoreKind::Sqlite);
    }

    #[test]
    fn test_priority_wire_form() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        let p: Priority = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(p, Priority::Low);
        assert!(serde_json::from_str::<Priority>("\"urgent\"").is_err());
    }

    #[test]
    fn test_patch_distinguishes_absent_from_null() {
        let absent: TaskPatch = serde_json::from_str("{}").unwrap();
        assert!(absent.description.is_none());

        let null: TaskPatch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(null.description, Some(None));

        let set: TaskPatch = serde_json::from_str(r#"{"description": "hi"}"#).unwrap();
        assert_eq!(set.description, Some(Some("hi".to_string())));
    }

    #[test]
    fn test_overdue_is_derived() {
        let now = Utc::now();
        let task = Task {
            id: 1,
            title: "t".to_string(),
            description: None,
            completed: false,
            priority: Priority::Medium,
            due_date: Some(now - chrono::Duration::hours(1)),
            user_id: 1,
            created_at: now,
            updated_at: now,
        };
        assert!(task.is_overdue(now));

        let done = Task {
            completed: true,
            ..task.clone()
        };
        assert!(!done.is_overdue(now));

        let undated = Task {
            due_date: None,
            ..task
        };
        assert!(!undated.is_overdue(now));
    }
}
