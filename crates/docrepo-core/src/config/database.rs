//! Document store connection configuration.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, ErrorKind};

/// Connection settings for the backing document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Store connection URI, e.g. `mongodb://localhost:27017`.
    pub connection_string: String,
    /// Optional user injected into the URI when it carries no credentials.
    #[serde(default)]
    pub user: Option<String>,
    /// Password paired with `user`.
    #[serde(default)]
    pub password: Option<String>,
    /// Database name that repositories resolve collections against.
    pub database: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl DatabaseConfig {
    /// Create a configuration for the given URI and database.
    pub fn new(connection_string: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            user: None,
            password: None,
            database: database.into(),
            max_pool_size: default_max_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }

    /// Return the connection URI with `user` / `password` applied.
    ///
    /// Credentials already embedded in `connection_string` win; `user` and
    /// `password` are only injected when the URI has no user of its own.
    pub fn connection_uri(&self) -> Result<String, AppError> {
        let Some(user) = self.user.as_deref().filter(|u| !u.is_empty()) else {
            return Ok(self.connection_string.clone());
        };

        let mut url = Url::parse(&self.connection_string).map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Invalid connection string: {e}"),
                e,
            )
        })?;

        if !url.username().is_empty() {
            return Ok(self.connection_string.clone());
        }

        url.set_username(user)
            .and_then(|_| url.set_password(self.password.as_deref()))
            .map_err(|_| AppError::configuration("Connection string cannot carry credentials"))?;

        Ok(url.to_string())
    }
}

fn default_max_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    10
}
