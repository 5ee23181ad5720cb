//! API request and response types.
//!
//! Task bodies reuse the domain types directly ([`crate::store::NewTask`],
//! [`crate::store::TaskPatch`], [`crate::store::TaskFilter`]); the types
//! here cover auth and the envelope responses.

use serde::{Deserialize, Serialize};

use crate::accounts::PublicUser;

/// Request to register a new account.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request to log in to an existing account.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for both register and login: the account plus a bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

/// Response after deleting a task. `success: false` means nothing matched;
/// it is not an error.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteTaskResponse {
    pub success: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
