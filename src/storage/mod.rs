//! Persistent store for users, chat sessions and messages
//!
//! The store is the system of record. [`SessionStore`] is the contract the
//! conversation controller talks to; [`UserStore`] backs signup and login.
//! Two backends implement both traits:
//!
//! - [`SqliteStore`]: embedded database file in the user's data directory
//! - [`PostgrestStore`]: hosted backend-as-a-service speaking PostgREST

use crate::config::StoreConfig;
use crate::error::{ChatbookError, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub mod postgrest;
pub mod sqlite;
pub mod types;

pub use postgrest::PostgrestStore;
pub use sqlite::SqliteStore;
pub use types::{ChatMessage, ChatSession, Sender, UserRecord};

/// Create/list/update/delete access to the session and message tables
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// All sessions, most recently updated first
    async fn list_sessions(&self) -> Result<Vec<ChatSession>>;

    /// Create a session; the store assigns id and timestamps
    async fn create_session(&self, name: &str) -> Result<ChatSession>;

    /// Rename a session
    ///
    /// # Errors
    ///
    /// Returns [`ChatbookError::NotFound`] when `id` does not exist
    async fn rename_session(&self, id: &str, name: &str) -> Result<()>;

    /// Delete a session after deleting every message it owns
    ///
    /// Deleting an id that does not exist succeeds.
    async fn delete_session(&self, id: &str) -> Result<()>;

    /// Messages of a session, oldest first
    ///
    /// An existing session may legitimately have no messages, including
    /// transiently while it is being deleted.
    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>>;

    /// Insert a message, then bump the owning session's `updated_at`
    ///
    /// # Errors
    ///
    /// Returns [`ChatbookError::NotFound`] when the session does not exist
    async fn append_message(
        &self,
        session_id: &str,
        text: &str,
        sender: Sender,
    ) -> Result<ChatMessage>;
}

/// Lookup and creation of user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by exact username
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>>;

    /// Insert a user; usernames are unique
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<UserRecord>;
}

/// Both views of one opened backend
#[derive(Clone)]
pub struct StoreHandles {
    /// Session and message tables
    pub sessions: Arc<dyn SessionStore>,
    /// Users table
    pub users: Arc<dyn UserStore>,
}

impl StoreHandles {
    fn from_backend<S>(store: S) -> Self
    where
        S: SessionStore + UserStore + 'static,
    {
        let store = Arc::new(store);
        Self {
            sessions: store.clone(),
            users: store,
        }
    }
}

/// Open the backend selected by `config.backend`
///
/// # Errors
///
/// Returns error if the backend name is unknown or the backend cannot be
/// initialized (database file not writable, missing PostgREST url).
pub fn open_store(config: &StoreConfig) -> Result<StoreHandles> {
    match config.backend.as_str() {
        "sqlite" => {
            let store = match &config.sqlite_path {
                Some(path) => SqliteStore::new_with_path(path)?,
                None => SqliteStore::new()?,
            };
            Ok(StoreHandles::from_backend(store))
        }
        "postgrest" => {
            let store = PostgrestStore::new(config.postgrest.clone())?;
            Ok(StoreHandles::from_backend(store))
        }
        other => Err(ChatbookError::Config(format!("Unknown store backend: {}", other)).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PostgrestConfig, StoreConfig};

    #[tokio::test]
    async fn test_open_store_sqlite_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            backend: "sqlite".to_string(),
            sqlite_path: Some(dir.path().join("chat.db")),
            postgrest: PostgrestConfig::default(),
        };

        let handles = open_store(&config).expect("open sqlite");
        let created = handles.sessions.create_session("New Chat").await.unwrap();
        let listed = handles.sessions.list_sessions().await.unwrap();
        assert_eq!(listed, vec![created]);
        assert!(handles.users.find_user("nobody").await.unwrap().is_none());
    }

    #[test]
    fn test_open_store_unknown_backend() {
        let config = StoreConfig {
            backend: "mongodb".to_string(),
            ..StoreConfig::default()
        };
        let err = open_store(&config).err().expect("should fail");
        assert!(err.to_string().contains("Unknown store backend"));
    }

    #[test]
    fn test_open_store_postgrest_requires_url() {
        let config = StoreConfig {
            backend: "postgrest".to_string(),
            sqlite_path: None,
            postgrest: PostgrestConfig {
                url: None,
                ..PostgrestConfig::default()
            },
        };
        assert!(open_store(&config).is_err());
    }
}
