//! SQLite backend for the session, message and user tables

use crate::error::{ChatbookError, Result};
use crate::storage::types::{now, ChatMessage, ChatSession, Sender, UserRecord};
use crate::storage::{SessionStore, UserStore};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS chat_sessions (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        session_id TEXT NOT NULL REFERENCES chat_sessions(id),
        message TEXT NOT NULL,
        sender TEXT NOT NULL CHECK (sender IN ('user', 'bot')),
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, created_at);
    CREATE INDEX IF NOT EXISTS idx_sessions_updated ON chat_sessions(updated_at);
";

const SESSION_COLS: &str = "id, name, created_at, updated_at";
const MESSAGE_COLS: &str = "id, session_id, message, sender, created_at";

/// Embedded relational store
///
/// Every operation opens its own connection, so the handle is cheap to clone
/// and can be moved onto the blocking thread pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Create a store in the user's data directory
    pub fn new() -> Result<Self> {
        let db_path = crate::config::default_data_dir()?.join("chatbook.db");
        Self::new_with_path(db_path)
    }

    /// Create a store backed by the given database file
    ///
    /// # Examples
    ///
    /// ```
    /// use chatbook::storage::SqliteStore;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = SqliteStore::new_with_path(dir.path().join("chat.db")).unwrap();
    /// assert!(store.db_path().exists());
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ChatbookError::Store(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let store = Self { db_path };
        store.init()?;
        tracing::debug!("Opened SQLite store at {}", store.db_path.display());
        Ok(store)
    }

    /// Location of the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path).map_err(store_err("Failed to open database"))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(store_err("Failed to enable foreign keys"))?;
        Ok(conn)
    }

    fn init(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute_batch(SCHEMA)
            .map_err(store_err("Failed to create tables"))?;
        Ok(())
    }

    /// Run a blocking database operation off the async executor
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&SqliteStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| ChatbookError::Store(format!("Database task failed: {}", e)))?
    }

    fn list_sessions_blocking(&self) -> Result<Vec<ChatSession>> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SESSION_COLS} FROM chat_sessions ORDER BY updated_at DESC, rowid DESC"
            ))
            .map_err(store_err("Failed to prepare statement"))?;

        let sessions = stmt
            .query_map([], row_to_session)
            .map_err(store_err("Failed to query sessions"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err("Failed to read sessions"))?;

        Ok(sessions)
    }

    fn create_session_blocking(&self, name: &str) -> Result<ChatSession> {
        let conn = self.open()?;
        let ts = now();
        let session = ChatSession {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: ts,
            updated_at: ts,
        };

        conn.execute(
            "INSERT INTO chat_sessions (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id,
                session.name,
                format_ts(&session.created_at),
                format_ts(&session.updated_at)
            ],
        )
        .map_err(store_err("Failed to insert session"))?;

        Ok(session)
    }

    fn rename_session_blocking(&self, id: &str, name: &str) -> Result<()> {
        let conn = self.open()?;
        let changed = conn
            .execute(
                "UPDATE chat_sessions SET name = ?1 WHERE id = ?2",
                params![name, id],
            )
            .map_err(store_err("Failed to rename session"))?;

        if changed == 0 {
            return Err(ChatbookError::NotFound(format!("session {}", id)).into());
        }
        Ok(())
    }

    fn delete_session_blocking(&self, id: &str) -> Result<()> {
        let mut conn = self.open()?;
        let tx = conn
            .transaction()
            .map_err(store_err("Failed to start transaction"))?;

        tx.execute("DELETE FROM messages WHERE session_id = ?1", params![id])
            .map_err(store_err("Failed to delete messages"))?;
        tx.execute("DELETE FROM chat_sessions WHERE id = ?1", params![id])
            .map_err(store_err("Failed to delete session"))?;

        tx.commit()
            .map_err(store_err("Failed to commit transaction"))?;
        Ok(())
    }

    fn list_messages_blocking(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {MESSAGE_COLS} FROM messages WHERE session_id = ?1 ORDER BY created_at ASC, rowid ASC"
            ))
            .map_err(store_err("Failed to prepare statement"))?;

        let messages = stmt
            .query_map(params![session_id], row_to_message)
            .map_err(store_err("Failed to query messages"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err("Failed to read messages"))?;

        Ok(messages)
    }

    fn append_message_blocking(
        &self,
        session_id: &str,
        text: &str,
        sender: Sender,
    ) -> Result<ChatMessage> {
        let mut conn = self.open()?;
        let tx = conn
            .transaction()
            .map_err(store_err("Failed to start transaction"))?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM chat_sessions WHERE id = ?1",
                params![session_id],
                |_| Ok(()),
            )
            .optional()
            .map_err(store_err("Failed to look up session"))?
            .is_some();
        if !exists {
            return Err(ChatbookError::NotFound(format!("session {}", session_id)).into());
        }

        let message = ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            message: text.to_string(),
            sender,
            created_at: now(),
        };
        let created_at = format_ts(&message.created_at);

        tx.execute(
            "INSERT INTO messages (id, session_id, message, sender, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id,
                message.session_id,
                message.message,
                message.sender.as_str(),
                created_at
            ],
        )
        .map_err(store_err("Failed to insert message"))?;

        tx.execute(
            "UPDATE chat_sessions SET updated_at = ?1 WHERE id = ?2",
            params![created_at, session_id],
        )
        .map_err(store_err("Failed to touch session"))?;

        tx.commit()
            .map_err(store_err("Failed to commit transaction"))?;
        Ok(message)
    }

    fn find_user_blocking(&self, username: &str) -> Result<Option<UserRecord>> {
        let conn = self.open()?;
        let user = conn
            .query_row(
                "SELECT id, username, password_hash FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(UserRecord {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        password_hash: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(store_err("Failed to query user"))?;
        Ok(user)
    }

    fn create_user_blocking(&self, username: &str, password_hash: &str) -> Result<UserRecord> {
        let conn = self.open()?;
        let user = UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        };

        conn.execute(
            "INSERT INTO users (id, username, password_hash) VALUES (?1, ?2, ?3)",
            params![user.id, user.username, user.password_hash],
        )
        .map_err(|e| ChatbookError::Store(e.to_string()))?;

        Ok(user)
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        self.run(|store| store.list_sessions_blocking()).await
    }

    async fn create_session(&self, name: &str) -> Result<ChatSession> {
        let name = name.to_string();
        self.run(move |store| store.create_session_blocking(&name))
            .await
    }

    async fn rename_session(&self, id: &str, name: &str) -> Result<()> {
        let (id, name) = (id.to_string(), name.to_string());
        self.run(move |store| store.rename_session_blocking(&id, &name))
            .await
    }

    async fn delete_session(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.run(move |store| store.delete_session_blocking(&id))
            .await
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let session_id = session_id.to_string();
        self.run(move |store| store.list_messages_blocking(&session_id))
            .await
    }

    async fn append_message(
        &self,
        session_id: &str,
        text: &str,
        sender: Sender,
    ) -> Result<ChatMessage> {
        let (session_id, text) = (session_id.to_string(), text.to_string());
        self.run(move |store| store.append_message_blocking(&session_id, &text, sender))
            .await
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>> {
        let username = username.to_string();
        self.run(move |store| store.find_user_blocking(&username))
            .await
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<UserRecord> {
        let (username, password_hash) = (username.to_string(), password_hash.to_string());
        self.run(move |store| store.create_user_blocking(&username, &password_hash))
            .await
    }
}

fn store_err(context: &'static str) -> impl Fn(rusqlite::Error) -> ChatbookError {
    move |e| ChatbookError::Store(format!("{}: {}", context, e))
}

/// Fixed-width UTC timestamps so lexical order matches time order
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<ChatSession> {
    Ok(ChatSession {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_ts(row, 2)?,
        updated_at: parse_ts(row, 3)?,
    })
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    let sender: String = row.get(3)?;
    let sender = sender
        .parse::<Sender>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    Ok(ChatMessage {
        id: row.get(0)?,
        session_id: row.get(1)?,
        message: row.get(2)?,
        sender,
        created_at: parse_ts(row, 4)?,
    })
}
