//! Application configuration loaded from environment variables
//!
//! A `.env` file in the working directory is honoured for local development.

use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_ENDPOINT: &str = "https://cloud.appwrite.io/v1";
const DEFAULT_PLATFORM: &str = "com.homefit.app";

/// Collection ids inside the configured database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collections {
    pub users: String,
    pub body_parts: String,
    pub exercises: String,
    pub tips: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            users: "users".to_string(),
            body_parts: "body_parts".to_string(),
            exercises: "exercises".to_string(),
            tips: "tips".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// BaaS REST endpoint, including the `/v1` suffix
    pub endpoint: String,
    pub project_id: String,
    /// Application platform identifier registered with the project
    pub platform: String,
    pub database_id: String,
    pub collections: Collections,
    /// SQLite file backing the local key-value store
    pub store_path: String,
    /// Where logs go while the dashboard owns the terminal
    pub log_file: String,
    pub http_timeout: Duration,
    /// Attempts per remote read, first try included
    pub retry_attempts: u32,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            project_id: "test-project".to_string(),
            platform: DEFAULT_PLATFORM.to_string(),
            database_id: "test-db".to_string(),
            collections: Collections::default(),
            store_path: "homefit.db".to_string(),
            log_file: "homefit.log".to_string(),
            http_timeout: Duration::from_secs(30),
            retry_attempts: 3,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let required = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let number = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(name).map(|v| v.trim().to_string()) {
                None => Ok(default),
                Some(v) if v.is_empty() => Ok(default),
                Some(v) => v.parse().map_err(|_| ConfigError::Invalid { name, value: v }),
            }
        };

        let defaults = Collections::default();
        let retry_attempts = number("HOMEFIT_RETRY_ATTEMPTS", 3)?;
        if retry_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "HOMEFIT_RETRY_ATTEMPTS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            endpoint: var("HOMEFIT_ENDPOINT", DEFAULT_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            project_id: required("HOMEFIT_PROJECT_ID")?,
            platform: var("HOMEFIT_PLATFORM", DEFAULT_PLATFORM),
            database_id: required("HOMEFIT_DATABASE_ID")?,
            collections: Collections {
                users: var("HOMEFIT_USERS_COLLECTION", &defaults.users),
                body_parts: var("HOMEFIT_BODY_PARTS_COLLECTION", &defaults.body_parts),
                exercises: var("HOMEFIT_EXERCISES_COLLECTION", &defaults.exercises),
                tips: var("HOMEFIT_TIPS_COLLECTION", &defaults.tips),
            },
            store_path: var("HOMEFIT_STORE_PATH", "homefit.db"),
            log_file: var("HOMEFIT_LOG_FILE", "homefit.log"),
            http_timeout: Duration::from_secs(number("HOMEFIT_HTTP_TIMEOUT_SECS", 30)?),
            retry_attempts: u32::try_from(retry_attempts).map_err(|_| ConfigError::Invalid {
                name: "HOMEFIT_RETRY_ATTEMPTS",
                value: retry_attempts.to_string(),
            })?,
        })
    }
}
