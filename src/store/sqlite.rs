//! SQLite-based store for users and tasks.

use super::{NewTask, Priority, Task, TaskFilter, TaskPatch, TaskStore, User, UserStore};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    completed INTEGER NOT NULL DEFAULT 0,
    priority TEXT NOT NULL DEFAULT 'medium',
    due_date TEXT,
    user_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id);
CREATE INDEX IF NOT EXISTS idx_tasks_user_completed ON tasks(user_id, completed);
"#;

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        let db_path = data_dir.join("taskdeck.db");

        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| Error::Storage(format!("Failed to create data dir: {}", e)))?;

        // Open database in blocking task
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)
                .map_err(|e| Error::Storage(format!("Failed to open SQLite database: {}", e)))?;

            conn.execute_batch(SCHEMA)
                .map_err(|e| Error::Storage(format!("Failed to run schema: {}", e)))?;

            Ok::<_, Error>(conn)
        })
        .await
        .map_err(|e| Error::Storage(format!("Task join error: {}", e)))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn parse_priority(s: &str) -> Priority {
    match s {
        "low" => Priority::Low,
        "medium" => Priority::Medium,
        "high" => Priority::High,
        _ => Priority::Medium,
    }
}

fn priority_to_string(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

const TASK_COLUMNS: &str =
    "id, title, description, completed, priority, due_date, user_id, created_at, updated_at";

fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let priority: String = row.get(4)?;
    let due_date: Option<String> = row.get(5)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        completed: row.get::<_, i64>(3)? != 0,
        priority: parse_priority(&priority),
        due_date: due_date.as_deref().map(parse_timestamp),
        user_id: row.get(6)?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let created_at: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: parse_timestamp(&created_at),
    })
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User> {
        let conn = self.conn.clone();
        let username = username.to_string();
        let email = email.to_string();
        let password_hash = password_hash.to_string();
        let now = Utc::now();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();

            // Email first, then username, so a request violating both
            // reports the email conflict.
            let email_taken = conn
                .prepare("SELECT 1 FROM users WHERE email = ?1")?
                .exists(params![email])?;
            if email_taken {
                return Err(Error::Conflict(
                    "User with this email already exists".to_string(),
                ));
            }

            let username_taken = conn
                .prepare("SELECT 1 FROM users WHERE username = ?1")?
                .exists(params![username])?;
            if username_taken {
                return Err(Error::Conflict("Username is already taken".to_string()));
            }

            conn.execute(
                "INSERT INTO users (username, email, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![username, email, password_hash, now.to_rfc3339()],
            )?;

            Ok(User {
                id: conn.last_insert_rowid(),
                username,
                email,
                password_hash,
                created_at: now,
            })
        })
        .await
        .map_err(|e| Error::Storage(format!("Task join error: {}", e)))?
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.clone();
        let email = email.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let user = conn
                .query_row(
                    "SELECT id, username, email, password_hash, created_at
                     FROM users WHERE email = ?1",
                    params![email],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
        .await
        .map_err(|e| Error::Storage(format!("Task join error: {}", e)))?
    }
}

#[async_trait]
impl TaskStore for SqliteStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn insert_task(&self, owner_id: i64, draft: NewTask) -> Result<Task> {
        let conn = self.conn.clone();
        let now = Utc::now();
        let priority = draft.priority.unwrap_or_default();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO tasks (title, description, completed, priority, due_date, user_id, created_at, updated_at)
                 VALUES (?1, ?2, 0, ?3, ?4, ?5, ?6, ?6)",
                params![
                    draft.title,
                    draft.description,
                    priority_to_string(priority),
                    draft.due_date.map(|d| d.to_rfc3339()),
                    owner_id,
                    now.to_rfc3339(),
                ],
            )?;

            Ok(Task {
                id: conn.last_insert_rowid(),
                title: draft.title,
                description: draft.description,
                completed: false,
                priority,
                due_date: draft.due_date,
                user_id: owner_id,
                created_at: now,
                updated_at: now,
            })
        })
        .await
        .map_err(|e| Error::Storage(format!("Task join error: {}", e)))?
    }

    async fn find_task(&self, id: i64, owner_id: i64) -> Result<Option<Task>> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let task = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM tasks WHERE id = ?1 AND user_id = ?2",
                        TASK_COLUMNS
                    ),
                    params![id, owner_id],
                    task_from_row,
                )
                .optional()?;
            Ok(task)
        })
        .await
        .map_err(|e| Error::Storage(format!("Task join error: {}", e)))?
    }

    async fn list_tasks(&self, owner_id: i64, filter: &TaskFilter) -> Result<Vec<Task>> {
        let conn = self.conn.clone();
        let filter = *filter;

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();

            // The owner condition is mandatory; the rest are appended only
            // when the filter supplies them.
            let mut sql = format!("SELECT {} FROM tasks WHERE user_id = ?", TASK_COLUMNS);
            let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(owner_id)];

            if let Some(completed) = filter.completed {
                sql.push_str(" AND completed = ?");
                values.push(Box::new(completed as i64));
            }
            if let Some(priority) = filter.priority {
                sql.push_str(" AND priority = ?");
                values.push(Box::new(priority_to_string(priority)));
            }
            sql.push_str(" ORDER BY id ASC");

            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map(params_from_iter(values.iter().map(|v| v.as_ref())), task_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(tasks)
        })
        .await
        .map_err(|e| Error::Storage(format!("Task join error: {}", e)))?
    }

    async fn update_task(
        &self,
        id: i64,
        owner_id: i64,
        patch: TaskPatch,
    ) -> Result<Option<Task>> {
        let conn = self.conn.clone();
        let now = Utc::now();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();

            // Single scoped UPDATE; the id + owner check and the write are
            // one statement, so a concurrent delete cannot leave a torn row.
            let mut sets: Vec<&str> = Vec::new();
            let mut values: Vec<Box<dyn ToSql>> = Vec::new();

            if let Some(title) = patch.title {
                sets.push("title = ?");
                values.push(Box::new(title));
            }
            if let Some(description) = patch.description {
                sets.push("description = ?");
                values.push(Box::new(description));
            }
            if let Some(completed) = patch.completed {
                sets.push("completed = ?");
                values.push(Box::new(completed as i64));
            }
            if let Some(priority) = patch.priority {
                sets.push("priority = ?");
                values.push(Box::new(priority_to_string(priority)));
            }
            if let Some(due_date) = patch.due_date {
                sets.push("due_date = ?");
                values.push(Box::new(due_date.map(|d| d.to_rfc3339())));
            }

            // updated_at is refreshed on every call, even for an empty patch.
            sets.push("updated_at = ?");
            values.push(Box::new(now.to_rfc3339()));
            values.push(Box::new(id));
            values.push(Box::new(owner_id));

            let sql = format!(
                "UPDATE tasks SET {} WHERE id = ? AND user_id = ?",
                sets.join(", ")
            );
            let rows = conn.execute(&sql, params_from_iter(values.iter().map(|v| v.as_ref())))?;

            if rows == 0 {
                return Ok(None);
            }

            let task = conn.query_row(
                &format!(
                    "SELECT {} FROM tasks WHERE id = ?1 AND user_id = ?2",
                    TASK_COLUMNS
                ),
                params![id, owner_id],
                task_from_row,
            )?;
            Ok(Some(task))
        })
        .await
        .map_err(|e| Error::Storage(format!("Task join error: {}", e)))?
    }

    async fn delete_task(&self, id: i64, owner_id: i64) -> Result<bool> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let rows = conn.execute(
                "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![id, owner_id],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| Error::Storage(format!("Task join error: {}", e)))?
    }
}
