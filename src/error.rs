//! Error types for Chatbook
//!
//! This module defines the error taxonomy used throughout the application,
//! using `thiserror` for ergonomic error handling. Store, lookup and
//! authentication failures share [`ChatbookError`]; failures of the assistant
//! endpoint are reported separately through
//! [`crate::providers::AssistantError`] so the caller decides the fallback
//! text.

use thiserror::Error;

/// Main error type for Chatbook operations
#[derive(Error, Debug)]
pub enum ChatbookError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network, auth or constraint failure reported by the persistent store
    #[error("Store error: {0}")]
    Store(String),

    /// An operation referenced an id that does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Login failed; the message is shown to the user verbatim
    #[error("{0}")]
    Authentication(String),

    /// Signup failed; the message is shown to the user verbatim
    #[error("{0}")]
    Signup(String),

    /// An operation was invoked from a controller state that does not allow it
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ChatbookError {
    /// Returns true when `err` wraps a [`ChatbookError::NotFound`]
    pub fn is_not_found(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<ChatbookError>(),
            Some(ChatbookError::NotFound(_))
        )
    }
}

/// Result type alias for Chatbook operations
///
/// Uses `anyhow::Error` so context can be attached while the typed
/// [`ChatbookError`] stays reachable through `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
