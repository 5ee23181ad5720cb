//! Shared error taxonomy for stores and services.
//!
//! `NotFound` deliberately covers both "no such task" and "task belongs to
//! another user" so that callers cannot probe for the existence of other
//! users' tasks. `InvalidCredentials` carries one fixed message for the
//! same reason (no account enumeration on login).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input (empty/too-long title, out-of-range register fields).
    #[error("{0}")]
    Validation(String),

    /// Task absent or owned by someone else. Never distinguishes the two.
    #[error("task not found")]
    NotFound,

    /// Duplicate username or email on registration.
    #[error("{0}")]
    Conflict(String),

    /// Login failure. Same message whether the email is unknown or the
    /// password is wrong.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Backing store failure. Propagated as-is, never retried here.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
