//! # taskdeck
//!
//! Multi-user task tracking service.
//!
//! This library provides:
//! - An HTTP API for registration, login, and task CRUD
//! - Ownership-scoped task storage (SQLite or in-memory)
//! - Partial updates that distinguish "field absent" from "field null"
//! - Composable list filters (completed, priority)
//!
//! ## Architecture
//!
//! ```text
//!        ┌──────────────────────────────────┐
//!        │            api (axum)            │
//!        │   resolves token → AuthUser.id   │
//!        └────────┬────────────────┬────────┘
//!                 │                │
//!                 ▼                ▼
//!        ┌───────────────┐ ┌───────────────┐
//!        │ AccountService│ │  TaskService  │
//!        └───────┬───────┘ └───────┬───────┘
//!                │                 │
//!                ▼                 ▼
//!        ┌─────────────────────────────────┐
//!        │  UserStore / TaskStore backends │
//!        │       (sqlite | memory)         │
//!        └─────────────────────────────────┘
//! ```
//!
//! Every task operation carries the acting user id explicitly; the store
//! matches on id + owner together, so foreign tasks look exactly like
//! missing ones.
//!
//! ## Modules
//! - `accounts`: registration and login
//! - `tasks`: owner-scoped task operations
//! - `store`: storage backends and domain types
//! - `api`: HTTP surface

pub mod accounts;
pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod store;
pub mod tasks;

pub use accounts::AccountService;
pub use config::Config;
pub use error::Error;
pub use tasks::TaskService;
