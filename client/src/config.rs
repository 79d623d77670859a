//! Configuration management for the client.

use std::env;
use std::time::Duration;
use tote_engine::Session;

const DEFAULT_DATABASE_URL: &str = "sqlite://tote.db?mode=rwc";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the collection API, e.g. `https://shop.example/api`
    pub api_url: Option<String>,
    /// SQLite URL of the local store
    pub database_url: String,
    /// Timeout applied to every remote request
    pub request_timeout: Duration,
    /// Signed-in user, if any
    pub user_id: Option<String>,
    /// Token sent as `Authorization: JWT <token>`
    pub auth_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = non_empty("API_URL").map(|url| url.trim_end_matches('/').to_string());

        let database_url =
            non_empty("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let request_timeout = match non_empty("REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().ok().filter(|secs| *secs > 0);
                match secs {
                    Some(secs) => Duration::from_secs(secs),
                    None => return Err(ConfigError::InvalidTimeout(raw)),
                }
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_url,
            database_url,
            request_timeout,
            user_id: non_empty("USER_ID"),
            auth_token: non_empty("AUTH_TOKEN"),
        })
    }

    /// The API base URL, required whenever a real backend is used.
    pub fn require_api_url(&self) -> Result<&str, ConfigError> {
        self.api_url.as_deref().ok_or(ConfigError::MissingApiUrl)
    }

    /// The session described by `USER_ID` and `AUTH_TOKEN`.
    pub fn session(&self) -> Session {
        Session {
            user_id: self.user_id.clone(),
            auth_token: self.auth_token.clone(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API_URL environment variable is required")]
    MissingApiUrl,

    #[error("Invalid REQUEST_TIMEOUT_SECS value: {0}")]
    InvalidTimeout(String),
}
