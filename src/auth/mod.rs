//! Account signup, login and logout
//!
//! Accounts live in the store's `users` table. The signed-in user is kept
//! client-side by [`CredentialStore`] and handed to the conversation
//! controller as an [`AuthContext`].

pub mod credentials;
pub mod password;

pub use credentials::CredentialStore;

use crate::error::{ChatbookError, Result};
use crate::storage::UserStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shown for every failed login, whatever the cause
pub const INVALID_CREDENTIALS: &str = "Invalid username or password.";

/// Shown when signing up with a username that exists
pub const USERNAME_TAKEN: &str = "Username already taken.";

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// User id from the store
    pub id: String,
    /// Login name
    pub username: String,
}

/// Signup, login and logout against a [`UserStore`]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    credentials: CredentialStore,
    bcrypt_cost: u32,
}

impl AuthService {
    /// Create a service persisting sign-ins to `credentials`
    pub fn new(users: Arc<dyn UserStore>, credentials: CredentialStore, bcrypt_cost: u32) -> Self {
        Self {
            users,
            credentials,
            bcrypt_cost,
        }
    }

    /// Where the signed-in user is recorded
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Create an account; does not sign in
    ///
    /// # Errors
    ///
    /// Returns [`ChatbookError::Signup`] with [`USERNAME_TAKEN`] when the
    /// username exists, or with the store's message when the insert fails
    pub async fn signup(&self, username: &str, password: &str) -> Result<()> {
        match self.users.find_user(username).await {
            Ok(Some(_)) => return Err(ChatbookError::Signup(USERNAME_TAKEN.to_string()).into()),
            Ok(None) => {}
            Err(e) => tracing::warn!("Username lookup failed, attempting insert: {}", e),
        }

        let hash = password::hash_password(password, self.bcrypt_cost)?;
        let user = self
            .users
            .create_user(username, &hash)
            .await
            .map_err(|e| ChatbookError::Signup(store_message(&e)))?;

        tracing::info!("Created account {} ({})", user.username, user.id);
        Ok(())
    }

    /// Verify credentials and record the user as signed in
    ///
    /// # Errors
    ///
    /// Returns [`ChatbookError::Authentication`] with [`INVALID_CREDENTIALS`]
    /// for an unknown user, a wrong password or a failed lookup
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthContext> {
        let user = match self.users.find_user(username).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::debug!("Login for unknown user {}", username);
                return Err(invalid_credentials());
            }
            Err(e) => {
                tracing::warn!("User lookup failed during login: {}", e);
                return Err(invalid_credentials());
            }
        };

        if !password::verify_password(password, &user.password_hash) {
            tracing::debug!("Wrong password for {}", username);
            return Err(invalid_credentials());
        }

        let context = AuthContext {
            id: user.id,
            username: user.username,
        };
        self.credentials.save(&context)?;
        tracing::info!("Signed in as {}", context.username);
        Ok(context)
    }

    /// Forget the signed-in user
    pub fn logout(&self) -> Result<()> {
        self.credentials.clear()?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// The signed-in user, if any
    pub fn current(&self) -> Result<Option<AuthContext>> {
        self.credentials.load()
    }
}

fn invalid_credentials() -> anyhow::Error {
    ChatbookError::Authentication(INVALID_CREDENTIALS.to_string()).into()
}

/// Message of the underlying store error without our own prefix
fn store_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ChatbookError>() {
        Some(ChatbookError::Store(message)) => message.clone(),
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::UserRecord;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct MemoryUsers {
        users: Mutex<Vec<UserRecord>>,
        fail_lookup: bool,
        fail_insert: Option<String>,
    }

    #[async_trait]
    impl UserStore for MemoryUsers {
        async fn find_user(&self, username: &str) -> Result<Option<UserRecord>> {
            if self.fail_lookup {
                return Err(ChatbookError::Store("connection refused".to_string()).into());
            }
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.username == username).cloned())
        }

        async fn create_user(&self, username: &str, password_hash: &str) -> Result<UserRecord> {
            if let Some(message) = &self.fail_insert {
                return Err(ChatbookError::Store(message.clone()).into());
            }
            let mut users = self.users.lock().unwrap();
            let user = UserRecord {
                id: format!("u-{}", users.len() + 1),
                username: username.to_string(),
                password_hash: password_hash.to_string(),
            };
            users.push(user.clone());
            Ok(user)
        }
    }

    fn service(users: MemoryUsers) -> (AuthService, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let credentials = CredentialStore::with_path(dir.path().join("session.json"));
        (AuthService::new(Arc::new(users), credentials, 4), dir)
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let (auth, _dir) = service(MemoryUsers::default());
        auth.signup("ada", "pw").await.unwrap();
        assert_eq!(auth.current().unwrap(), None);

        let context = auth.login("ada", "pw").await.unwrap();
        assert_eq!(context.username, "ada");
        assert_eq!(context.id, "u-1");
        assert_eq!(auth.current().unwrap(), Some(context));
    }

    #[tokio::test]
    async fn test_signup_stores_hash_not_password() {
        let users = Arc::new(MemoryUsers::default());
        let dir = tempdir().unwrap();
        let auth = AuthService::new(
            users.clone(),
            CredentialStore::with_path(dir.path().join("s.json")),
            4,
        );
        auth.signup("ada", "secret").await.unwrap();

        let stored = users.users.lock().unwrap()[0].password_hash.clone();
        assert_ne!(stored, "secret");
        assert!(stored.starts_with("$2b$04$"));
        assert!(password::verify_password("secret", &stored));
    }

    #[tokio::test]
    async fn test_login_accepts_hash_from_other_bcrypt_implementation() {
        let users = MemoryUsers::default();
        users.users.lock().unwrap().push(UserRecord {
            id: "u-7".to_string(),
            username: "legacy".to_string(),
            password_hash: "$2a$05$CCCCCCCCCCCCCCCCCCCCC.E5YPO9kmyuRGyh0XouQYb4YMJKvyOeW"
                .to_string(),
        });
        let (auth, _dir) = service(users);

        let err = auth.login("legacy", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), INVALID_CREDENTIALS);

        let context = auth.login("legacy", "U*U").await.unwrap();
        assert_eq!(context.id, "u-7");
    }

    #[tokio::test]
    async fn test_signup_duplicate_username() {
        let (auth, _dir) = service(MemoryUsers::default());
        auth.signup("ada", "pw").await.unwrap();
        let err = auth.signup("ada", "other").await.unwrap_err();
        assert_eq!(err.to_string(), "Username already taken.");
    }

    #[tokio::test]
    async fn test_signup_insert_failure_surfaces_store_message() {
        let (auth, _dir) = service(MemoryUsers {
            fail_insert: Some("duplicate key value violates unique constraint".to_string()),
            ..MemoryUsers::default()
        });
        let err = auth.signup("ada", "pw").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChatbookError>(),
            Some(ChatbookError::Signup(_))
        ));
        assert_eq!(
            err.to_string(),
            "duplicate key value violates unique constraint"
        );
    }

    #[tokio::test]
    async fn test_login_failures_share_one_message() {
        let (auth, _dir) = service(MemoryUsers::default());
        auth.signup("ada", "pw").await.unwrap();

        let unknown = auth.login("grace", "pw").await.unwrap_err();
        let wrong = auth.login("ada", "nope").await.unwrap_err();
        assert_eq!(unknown.to_string(), INVALID_CREDENTIALS);
        assert_eq!(wrong.to_string(), INVALID_CREDENTIALS);
        assert_eq!(auth.current().unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_lookup_failure_is_invalid_credentials() {
        let (auth, _dir) = service(MemoryUsers {
            fail_lookup: true,
            ..MemoryUsers::default()
        });
        let err = auth.login("ada", "pw").await.unwrap_err();
        assert_eq!(err.to_string(), INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn test_logout_clears_context() {
        let (auth, _dir) = service(MemoryUsers::default());
        auth.signup("ada", "pw").await.unwrap();
        auth.login("ada", "pw").await.unwrap();

        auth.logout().unwrap();
        assert_eq!(auth.current().unwrap(), None);
    }
}
