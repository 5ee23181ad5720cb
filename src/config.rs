//! Configuration management for taskdeck.
//!
//! Configuration can be set via environment variables:
//! - `JWT_SECRET` - Required. Secret used to sign session tokens.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `TASKDECK_DATA_DIR` - Optional. Directory for the SQLite database. Defaults to the current directory.
//! - `TASKDECK_STORE` - Optional. Storage backend, `sqlite` or `memory`. Defaults to `sqlite`.
//! - `TOKEN_TTL_DAYS` - Optional. Session token lifetime in days. Defaults to `30`.

use std::path::PathBuf;
use thiserror::Error;

use crate::store::StoreKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Directory holding the SQLite database file
    pub data_dir: PathBuf,

    /// Storage backend selection
    pub store: StoreKind,

    /// Secret for signing session JWTs
    pub jwt_secret: String,

    /// Session token lifetime in days
    pub token_ttl_days: i64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `JWT_SECRET` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let data_dir = std::env::var("TASKDECK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let store = std::env::var("TASKDECK_STORE")
            .map(|s| StoreKind::from_str(&s))
            .unwrap_or_default();

        let token_ttl_days = std::env::var("TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("TOKEN_TTL_DAYS".to_string(), format!("{}", e))
            })?;

        Ok(Self {
            host,
            port,
            data_dir,
            store,
            jwt_secret,
            token_ttl_days,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(jwt_secret: String, data_dir: PathBuf) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            data_dir,
            store: StoreKind::default(),
            jwt_secret,
            token_ttl_days: 30,
        }
    }
}
