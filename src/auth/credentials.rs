//! Client-side record of the signed-in user
//!
//! The context lives in a small JSON file so every chatbook process on the
//! machine sees the same sign-in state. A process that remembers the context
//! it started with can call [`CredentialStore::changed_since`] to notice that
//! another process signed in or out.

use crate::auth::AuthContext;
use crate::config::AuthConfig;
use crate::error::{ChatbookError, Result};
use std::path::{Path, PathBuf};

/// JSON file holding the current [`AuthContext`]
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Credentials file in the user's data directory
    ///
    /// The `CHATBOOK_CREDENTIALS` environment variable overrides the location.
    pub fn new() -> Result<Self> {
        if let Ok(path) = std::env::var("CHATBOOK_CREDENTIALS") {
            return Ok(Self::with_path(path));
        }
        Ok(Self::with_path(
            crate::config::default_data_dir()?.join("session.json"),
        ))
    }

    /// Credentials file at an explicit location
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Credentials file selected by configuration
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        match &config.credentials_path {
            Some(path) => Ok(Self::with_path(path.clone())),
            None => Self::new(),
        }
    }

    /// Location of the credentials file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current context, or `None` when signed out
    ///
    /// An unreadable or malformed file counts as signed out.
    pub fn load(&self) -> Result<Option<AuthContext>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ChatbookError::Io(e).into()),
        };

        match serde_json::from_str(&contents) {
            Ok(context) => Ok(Some(context)),
            Err(e) => {
                tracing::warn!(
                    "Ignoring malformed credentials file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    /// Persist `context` as the signed-in user
    pub fn save(&self, context: &AuthContext) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(context)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        tracing::debug!("Saved credentials to {}", self.path.display());
        Ok(())
    }

    /// Remove the persisted context; signing out twice is fine
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ChatbookError::Io(e).into()),
        }
    }

    /// True when the persisted context differs from `known`
    pub fn changed_since(&self, known: Option<&AuthContext>) -> Result<bool> {
        Ok(self.load()?.as_ref() != known)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    fn ada() -> AuthContext {
        AuthContext {
            id: "u-1".to_string(),
            username: "ada".to_string(),
        }
    }

    #[test]
    fn test_missing_file_is_signed_out() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::with_path(dir.path().join("session.json"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::with_path(dir.path().join("nested/session.json"));

        store.save(&ada()).unwrap();
        assert_eq!(store.load().unwrap(), Some(ada()));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn test_malformed_file_is_signed_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(CredentialStore::with_path(path).load().unwrap(), None);
    }

    #[test]
    fn test_changed_since_sees_other_writers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let ours = CredentialStore::with_path(&path);
        let theirs = CredentialStore::with_path(&path);

        ours.save(&ada()).unwrap();
        let known = ours.load().unwrap();
        assert!(!ours.changed_since(known.as_ref()).unwrap());

        theirs.clear().unwrap();
        assert!(ours.changed_since(known.as_ref()).unwrap());

        let grace = AuthContext {
            id: "u-2".to_string(),
            username: "grace".to_string(),
        };
        theirs.save(&grace).unwrap();
        assert!(ours.changed_since(known.as_ref()).unwrap());
        assert!(!ours.changed_since(Some(&grace)).unwrap());
    }

    #[test]
    #[serial]
    fn test_new_respects_env_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::env::set_var("CHATBOOK_CREDENTIALS", &path);

        let store = CredentialStore::new().unwrap();
        std::env::remove_var("CHATBOOK_CREDENTIALS");

        assert_eq!(store.path(), path.as_path());
    }
}
