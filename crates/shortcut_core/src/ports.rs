//! crates/shortcut_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! The managed backend is reached only through these two ports: an identity
//! provider and a document store. Concrete implementations live in the `app` crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;

use crate::domain::Session;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all document-store operations.
/// This abstracts away the specific errors from the backend (HTTP, decoding, permissions).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Failures reported by the identity provider. Never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("no account for this email")]
    UserNotFound,
    #[error("wrong password")]
    WrongPassword,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already in use")]
    EmailAlreadyInUse,
    #[error("weak password")]
    WeakPassword,
    #[error("email not verified")]
    EmailNotVerified,
    #[error("too many requests")]
    TooManyRequests,
    #[error("network failure: {0}")]
    Network(String),
    #[error("identity provider error: {0}")]
    Unexpected(String),
}

impl AuthError {
    /// Maps an identity-provider error code to an `AuthError`.
    ///
    /// Accepts both the SDK style (`auth/user-not-found`) and the REST style
    /// (`EMAIL_NOT_FOUND`, `WEAK_PASSWORD : Password should be ...`).
    pub fn from_provider_code(code: &str) -> Self {
        let code = code.split(" : ").next().unwrap_or(code).trim();
        match code {
            "auth/invalid-email" | "INVALID_EMAIL" => AuthError::InvalidEmail,
            "auth/user-not-found" | "EMAIL_NOT_FOUND" => AuthError::UserNotFound,
            "auth/wrong-password" | "INVALID_PASSWORD" => AuthError::WrongPassword,
            "auth/invalid-credential" | "INVALID_LOGIN_CREDENTIALS" => {
                AuthError::InvalidCredentials
            }
            "auth/email-already-in-use" | "EMAIL_EXISTS" => AuthError::EmailAlreadyInUse,
            "auth/weak-password" | "WEAK_PASSWORD" => AuthError::WeakPassword,
            "auth/unverified-email" | "EMAIL_NOT_VERIFIED" => AuthError::EmailNotVerified,
            "auth/too-many-requests" | "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::TooManyRequests,
            "auth/network-request-failed" => AuthError::Network(code.to_string()),
            other => AuthError::Unexpected(other.to_string()),
        }
    }

    /// The static message shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidEmail => "Please enter a valid email address.",
            AuthError::UserNotFound => "No account found with this email address.",
            AuthError::WrongPassword => "Incorrect password. Please try again.",
            AuthError::InvalidCredentials => "Invalid email or password.",
            AuthError::EmailAlreadyInUse => "An account with this email already exists.",
            AuthError::WeakPassword => "Password should be at least 6 characters.",
            AuthError::EmailNotVerified => "Please verify your email address before signing in.",
            AuthError::TooManyRequests => "Too many failed attempts. Please try again later.",
            AuthError::Network(_) => "Network error. Please check your connection and try again.",
            AuthError::Unexpected(_) => "Something went wrong. Please try again.",
        }
    }
}

//=========================================================================================
// Document Shapes
//=========================================================================================

/// A document as stored remotely: its id plus the raw field map.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub id: String,
    pub data: Value,
}

/// One field-level mutation of a user document.
///
/// Paths are dot-separated (`stats.articlesRead`); `key` components are article
/// ids and are quoted by the adapter as needed.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Appends `value` to the array at `field` unless it is already present.
    ArrayUnion { field: String, value: String },
    /// Removes every occurrence of `value` from the array at `field`.
    ArrayRemove { field: String, value: String },
    /// Sets `field.key` to a timestamp in a map-valued field.
    MapSet { field: String, key: String, at: DateTime<Utc> },
    /// Deletes `field.key` from a map-valued field.
    MapDelete { field: String, key: String },
    Increment { path: Vec<String>, by: i64 },
    Set { path: Vec<String>, value: Value },
    /// Sets the path to the backend's own clock.
    ServerTimestamp { path: Vec<String> },
}

/// Stream of session changes; the first item is the current session.
pub type SessionStream = Pin<Box<dyn Stream<Item = Option<Session>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session, AuthError>;

    async fn sign_out(&self) -> PortResult<()>;

    /// The session the provider currently holds, if any.
    async fn current_session(&self) -> Option<Session>;

    /// The authoritative source of authenticated/unauthenticated transitions.
    fn session_events(&self) -> SessionStream;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All article documents, newest first where the backend can order them.
    async fn fetch_article_documents(&self) -> PortResult<Vec<RawDocument>>;

    async fn fetch_user_document(&self, uid: &str) -> PortResult<Option<Value>>;

    /// Creates the user document. Does nothing if one already exists.
    async fn create_user_document(&self, uid: &str, data: Value) -> PortResult<()>;

    async fn update_user_document(&self, uid: &str, updates: Vec<FieldUpdate>) -> PortResult<()>;
}
