//! services/app/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which backend the adapters talk to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    /// The managed backend: Firebase Auth + Cloud Firestore over REST.
    Firebase {
        api_key: String,
        project_id: String,
    },
    /// An in-process backend seeded with sample articles.
    Memory,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub backend: Backend,
    pub log_level: Level,
    pub articles_collection: String,
    pub users_collection: String,
    pub request_timeout: Duration,
    pub exit_confirm_window: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            log_level: Level::INFO,
            articles_collection: "articles".to_string(),
            users_collection: "users".to_string(),
            request_timeout: Duration::from_secs(15),
            exit_confirm_window: shortcut_core::navigation::EXIT_CONFIRM_WINDOW,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // --- Backend Selection ---
        let backend_name = lookup("SHORTCUT_BACKEND").unwrap_or_else(|| "memory".to_string());
        let backend = match backend_name.to_lowercase().as_str() {
            "memory" => Backend::Memory,
            "firebase" => Backend::Firebase {
                api_key: lookup("FIREBASE_API_KEY")
                    .ok_or_else(|| ConfigError::MissingVar("FIREBASE_API_KEY".to_string()))?,
                project_id: lookup("FIREBASE_PROJECT_ID")
                    .ok_or_else(|| ConfigError::MissingVar("FIREBASE_PROJECT_ID".to_string()))?,
            },
            other => {
                return Err(ConfigError::InvalidValue(
                    "SHORTCUT_BACKEND".to_string(),
                    format!("'{}' is not one of memory, firebase", other),
                ))
            }
        };

        // --- Logging ---
        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Collections and Timing ---
        let articles_collection =
            lookup("ARTICLES_COLLECTION").unwrap_or(defaults.articles_collection);
        let users_collection = lookup("USERS_COLLECTION").unwrap_or(defaults.users_collection);

        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("REQUEST_TIMEOUT_SECS", &raw)?),
            None => defaults.request_timeout,
        };
        let exit_confirm_window = match lookup("EXIT_CONFIRM_WINDOW_MS") {
            Some(raw) => Duration::from_millis(parse_number("EXIT_CONFIRM_WINDOW_MS", &raw)?),
            None => defaults.exit_confirm_window,
        };

        Ok(Self {
            backend,
            log_level,
            articles_collection,
            users_collection,
            request_timeout,
            exit_confirm_window,
        })
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}
