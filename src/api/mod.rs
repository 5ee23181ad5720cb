//! HTTP API for taskdeck.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/auth/register` - Create an account, returns user + token
//! - `POST /api/auth/login` - Log in, returns user + token
//! - `POST /api/tasks` - Create a task
//! - `GET /api/tasks?completed=&priority=` - List the caller's tasks
//! - `GET /api/tasks/{id}` - Get one task
//! - `PATCH /api/tasks/{id}` - Partially update a task
//! - `DELETE /api/tasks/{id}` - Delete a task, returns `{success}`
//!
//! All `/api/tasks` endpoints require `Authorization: Bearer <jwt>` and
//! operate only on the authenticated user's tasks.

mod auth;
mod routes;
pub mod types;

pub use routes::serve;
pub use types::*;
