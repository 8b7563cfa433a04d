use async_trait::async_trait;
use chatbook::providers::{Assistant, AssistantError};
use chatbook::storage::{ChatMessage, ChatSession, Sender, SessionStore, SqliteStore};
use chatbook::ChatbookError;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn create_temp_store() -> (SqliteStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("chatbook.db");
    let store = SqliteStore::new_with_path(db_path).expect("failed to create sqlite store with path");
    (store, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Fixed clock base so fake timestamps are deterministic
#[allow(dead_code)]
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
}

#[derive(Default)]
struct FakeState {
    sessions: Vec<ChatSession>,
    messages: Vec<ChatMessage>,
    next_id: usize,
    clock: i64,
}

/// In-memory [`SessionStore`] with switchable failures and call counters
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<FakeState>,
    pub fail_list: Mutex<bool>,
    pub fail_create: Mutex<bool>,
    pub fail_rename: Mutex<bool>,
    pub fail_delete: Mutex<bool>,
    pub fail_list_messages: Mutex<bool>,
    /// Fail the append of this sender only
    pub fail_append: Mutex<Option<Sender>>,
    pub create_calls: AtomicUsize,
    pub rename_calls: AtomicUsize,
    pub append_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session directly, bypassing counters
    pub fn seed_session(&self, name: &str, updated_minutes: i64) -> ChatSession {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let session = ChatSession {
            id: format!("s{}", state.next_id),
            name: name.to_string(),
            created_at: at(0),
            updated_at: at(updated_minutes),
        };
        state.sessions.push(session.clone());
        session
    }

    /// Insert a message directly, bypassing counters
    pub fn seed_message(&self, session_id: &str, text: &str, sender: Sender, minutes: i64) {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("m{}", state.next_id);
        state.messages.push(ChatMessage {
            id,
            session_id: session_id.to_string(),
            message: text.to_string(),
            sender,
            created_at: at(minutes),
        });
    }

    pub fn session_names(&self) -> Vec<String> {
        let mut sessions = self.state.lock().unwrap().sessions.clone();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions.into_iter().map(|s| s.name).collect()
    }

    pub fn message_count(&self, session_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .count()
    }

    pub fn set(flag: &Mutex<bool>, value: bool) {
        *flag.lock().unwrap() = value;
    }

    fn failing(flag: &Mutex<bool>, what: &str) -> chatbook::Result<()> {
        if *flag.lock().unwrap() {
            return Err(ChatbookError::Store(format!("{} unavailable", what)).into());
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FakeStore {
    async fn list_sessions(&self) -> chatbook::Result<Vec<ChatSession>> {
        Self::failing(&self.fail_list, "list")?;
        let mut sessions = self.state.lock().unwrap().sessions.clone();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn create_session(&self, name: &str) -> chatbook::Result<ChatSession> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Self::failing(&self.fail_create, "create")?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        state.clock += 1;
        let session = ChatSession {
            id: format!("s{}", state.next_id),
            name: name.to_string(),
            created_at: at(1000 + state.clock),
            updated_at: at(1000 + state.clock),
        };
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn rename_session(&self, id: &str, name: &str) -> chatbook::Result<()> {
        self.rename_calls.fetch_add(1, Ordering::SeqCst);
        Self::failing(&self.fail_rename, "rename")?;
        let mut state = self.state.lock().unwrap();
        match state.sessions.iter_mut().find(|s| s.id == id) {
            Some(session) => {
                session.name = name.to_string();
                Ok(())
            }
            None => Err(ChatbookError::NotFound(format!("session {}", id)).into()),
        }
    }

    async fn delete_session(&self, id: &str) -> chatbook::Result<()> {
        Self::failing(&self.fail_delete, "delete")?;
        let mut state = self.state.lock().unwrap();
        state.messages.retain(|m| m.session_id != id);
        state.sessions.retain(|s| s.id != id);
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> chatbook::Result<Vec<ChatMessage>> {
        Self::failing(&self.fail_list_messages, "list messages")?;
        let mut messages: Vec<ChatMessage> = self
            .state
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn append_message(
        &self,
        session_id: &str,
        text: &str,
        sender: Sender,
    ) -> chatbook::Result<ChatMessage> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_append.lock().unwrap() == Some(sender) {
            return Err(ChatbookError::Store("append unavailable".to_string()).into());
        }

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        state.clock += 1;
        let created_at = at(1000 + state.clock);
        let message = ChatMessage {
            id: format!("m{}", state.next_id),
            session_id: session_id.to_string(),
            message: text.to_string(),
            sender,
            created_at,
        };

        let session = state
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| ChatbookError::NotFound(format!("session {}", session_id)))?;
        session.updated_at = created_at;
        state.messages.push(message.clone());
        Ok(message)
    }
}

/// Assistant returning queued results, then echoing the prompt
#[derive(Default)]
pub struct FakeAssistant {
    replies: Mutex<VecDeque<Result<String, AssistantError>>>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeAssistant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, reply: Result<String, AssistantError>) {
        self.replies.lock().unwrap().push_back(reply);
    }
}

#[async_trait]
impl Assistant for FakeAssistant {
    async fn reply(&self, prompt: &str) -> Result<String, AssistantError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("echo: {}", prompt)))
    }
}
