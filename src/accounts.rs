//! Account registration and login.
//!
//! Credential hashing lives in [`crate::credentials`]; session token
//! issuance is the API layer's concern. This service only maps inputs to
//! store operations and projects users into their public shape.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::credentials;
use crate::error::{Error, Result};
use crate::store::{User, UserStore};

/// A user as exposed to clients. Never carries the credential hash.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Register a new account.
    ///
    /// Fails with `Error::Conflict` if the email or username is taken and
    /// with `Error::Validation` for out-of-range inputs.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<PublicUser> {
        let username_len = username.chars().count();
        if !(3..=50).contains(&username_len) {
            return Err(Error::Validation(
                "username must be between 3 and 50 characters".to_string(),
            ));
        }
        if !is_valid_email(email) {
            return Err(Error::Validation("email is not valid".to_string()));
        }
        if password.chars().count() < 6 {
            return Err(Error::Validation(
                "password must be at least 6 characters".to_string(),
            ));
        }

        let password_hash = credentials::hash_password(password);
        let user = self.users.insert_user(username, email, &password_hash).await?;
        tracing::info!("Registered user {} ({})", user.username, user.id);
        Ok(user.into())
    }

    /// Verify credentials and return the account.
    ///
    /// Unknown email and wrong password are indistinguishable: both fail
    /// with `Error::InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> Result<PublicUser> {
        let Some(user) = self.users.find_user_by_email(email).await? else {
            return Err(Error::InvalidCredentials);
        };

        if !credentials::verify_password(password, &user.password_hash) {
            return Err(Error::InvalidCredentials);
        }

        tracing::debug!("User {} logged in", user.id);
        Ok(user.into())
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}
