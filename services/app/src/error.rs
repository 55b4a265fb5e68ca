//! services/app/src/error.rs
//!
//! Defines the primary error type for the application service.

use crate::config::ConfigError;
use crate::driver::CommandError;
use shortcut_core::navigation::NavigationError;
use shortcut_core::ports::{AuthError, PortError};

/// The primary error type for the `app` service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// The identity provider rejected a sign-in or sign-up.
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// A transition the navigator does not allow from the current route.
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// A driver command could not be parsed or does not apply to the current screen.
    #[error("{0}")]
    Command(#[from] CommandError),

    /// Represents an error from the underlying HTTP client.
    #[error("HTTP Error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a standard Input/Output error (e.g., reading commands from stdin).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
