//! Conversation controller
//!
//! Owns the local copy of the session list, the active session and its
//! transcript, and drives the store and the assistant in response to user
//! actions. The store is authoritative: local state is updated optimistically
//! and reconciled by re-fetching, never written back.
//!
//! Store failures are logged and leave local state in its last good shape;
//! they are not returned to the caller. Errors returned from this module are
//! misuse ([`ChatbookError::InvalidState`]) or unknown ids
//! ([`ChatbookError::NotFound`]).

use crate::auth::AuthContext;
use crate::error::{ChatbookError, Result};
use crate::naming::{derive_name, DEFAULT_SESSION_NAME};
use crate::providers::{reply_or_fallback, Assistant};
use crate::storage::types::now;
use crate::storage::{ChatMessage, ChatSession, Sender, SessionStore};
use std::collections::HashSet;
use std::sync::Arc;

/// Lifecycle of a controller instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    /// Created, `initialize` not yet called
    Uninitialized,
    /// `initialize` is running
    Initializing,
    /// Accepting user actions
    Ready,
}

/// What became of a `send_message` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank text or a send already in flight; nothing changed
    Skipped,
    /// The bot reply was appended to the transcript
    Replied {
        /// Bot message as shown locally (fallback text when the assistant failed)
        reply: ChatMessage,
        /// Whether the store accepted the reply
        persisted: bool,
    },
    /// A store step failed before the assistant was asked
    Interrupted,
}

/// Session list, active transcript and the operations that change them
pub struct ConversationController {
    store: Arc<dyn SessionStore>,
    assistant: Arc<dyn Assistant>,
    user: AuthContext,
    phase: ControllerPhase,
    sessions: Vec<ChatSession>,
    active_session_id: Option<String>,
    messages: Vec<ChatMessage>,
    /// Ids of local messages the store has not confirmed
    pending: HashSet<String>,
    busy: bool,
}

impl ConversationController {
    /// Create an uninitialized controller for the signed-in `user`
    pub fn new(store: Arc<dyn SessionStore>, assistant: Arc<dyn Assistant>, user: AuthContext) -> Self {
        Self {
            store,
            assistant,
            user,
            phase: ControllerPhase::Uninitialized,
            sessions: Vec::new(),
            active_session_id: None,
            messages: Vec::new(),
            pending: HashSet::new(),
            busy: false,
        }
    }

    /// Signed-in user this controller acts for
    pub fn user(&self) -> &AuthContext {
        &self.user
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    /// True while a store or assistant call is outstanding
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Sessions, most recently updated first
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    /// Id of the active session, if any
    pub fn active_session_id(&self) -> Option<&str> {
        self.active_session_id.as_deref()
    }

    /// The active session, if any
    pub fn active_session(&self) -> Option<&ChatSession> {
        let id = self.active_session_id.as_deref()?;
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Transcript of the active session, oldest first
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Local messages the store has not confirmed yet
    pub fn pending_messages(&self) -> Vec<&ChatMessage> {
        self.messages
            .iter()
            .filter(|m| self.pending.contains(&m.id))
            .collect()
    }

    fn ensure_idle(&self, operation: &str) -> Result<()> {
        if self.phase != ControllerPhase::Ready {
            return Err(ChatbookError::InvalidState(format!(
                "{} requires an initialized controller",
                operation
            ))
            .into());
        }
        if self.busy {
            return Err(ChatbookError::InvalidState(format!(
                "{} is not allowed while another operation is running",
                operation
            ))
            .into());
        }
        Ok(())
    }

    /// Load sessions and activate the most recent one
    ///
    /// Creates a `"New Chat"` session when the store has none. Store failures
    /// are logged and leave the controller ready with whatever was loaded.
    ///
    /// # Errors
    ///
    /// Returns [`ChatbookError::InvalidState`] when called more than once
    pub async fn initialize(&mut self) -> Result<()> {
        if self.phase != ControllerPhase::Uninitialized {
            return Err(
                ChatbookError::InvalidState("initialize may only be called once".to_string())
                    .into(),
            );
        }

        self.phase = ControllerPhase::Initializing;
        self.busy = true;
        self.load_initial_state().await;
        self.busy = false;
        self.phase = ControllerPhase::Ready;

        tracing::info!(
            "Conversation ready for {}: {} session(s), active={:?}",
            self.user.username,
            self.sessions.len(),
            self.active_session_id
        );
        Ok(())
    }

    async fn load_initial_state(&mut self) {
        let sessions = match self.store.list_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::error!("Failed to initialize chat: {}", e);
                return;
            }
        };

        if sessions.is_empty() {
            match self.store.create_session(DEFAULT_SESSION_NAME).await {
                Ok(session) => {
                    self.active_session_id = Some(session.id.clone());
                    self.sessions = vec![session];
                }
                Err(e) => {
                    tracing::error!("Failed to create initial session: {}", e);
                    return;
                }
            }
        } else {
            self.sessions = sessions;
            sort_sessions(&mut self.sessions);
            self.active_session_id = self.sessions.first().map(|s| s.id.clone());
        }

        if let Some(id) = self.active_session_id.clone() {
            self.load_messages(&id).await;
        }
    }

    /// Replace the transcript with the store's copy; false if the fetch failed
    async fn load_messages(&mut self, session_id: &str) -> bool {
        match self.store.list_messages(session_id).await {
            Ok(messages) => {
                self.messages = messages;
                self.pending.clear();
                true
            }
            Err(e) => {
                tracing::error!("Error loading messages for {}: {}", session_id, e);
                false
            }
        }
    }

    /// Make `id` the active session and load its transcript
    ///
    /// Switching to the already active session does nothing. When the fetch
    /// fails the previous session stays active.
    ///
    /// # Errors
    ///
    /// Returns [`ChatbookError::NotFound`] when `id` is not in the session list
    pub async fn switch_session(&mut self, id: &str) -> Result<()> {
        self.ensure_idle("switch_session")?;

        if self.active_session_id.as_deref() == Some(id) {
            tracing::debug!("Session {} already active", id);
            return Ok(());
        }
        if !self.sessions.iter().any(|s| s.id == id) {
            return Err(ChatbookError::NotFound(format!("session {}", id)).into());
        }

        self.busy = true;
        let result = self.store.list_messages(id).await;
        self.busy = false;

        match result {
            Ok(messages) => {
                self.active_session_id = Some(id.to_string());
                self.messages = messages;
                self.pending.clear();
                tracing::debug!("Switched to session {}", id);
            }
            Err(e) => tracing::error!("Error loading messages for {}: {}", id, e),
        }
        Ok(())
    }

    /// Leave the active session without creating a new one yet
    ///
    /// The store-side session is created by the next `send_message`.
    pub fn start_new_chat(&mut self) -> Result<()> {
        self.ensure_idle("start_new_chat")?;
        self.active_session_id = None;
        self.messages.clear();
        self.pending.clear();
        Ok(())
    }

    /// Send `text` as a user message and record the assistant's reply
    ///
    /// Blank text, or a call while another send is running, is skipped
    /// without touching any state. The first message of a session still
    /// called `"New Chat"` also renames it.
    ///
    /// # Errors
    ///
    /// Returns [`ChatbookError::InvalidState`] before `initialize` completes
    pub async fn send_message(&mut self, text: &str) -> Result<SendOutcome> {
        if self.busy {
            tracing::debug!("Send ignored while busy");
            return Ok(SendOutcome::Skipped);
        }
        if self.phase != ControllerPhase::Ready {
            return Err(ChatbookError::InvalidState(
                "send_message requires an initialized controller".to_string(),
            )
            .into());
        }
        if text.trim().is_empty() {
            return Ok(SendOutcome::Skipped);
        }

        self.busy = true;
        let outcome = self.run_send(text).await;
        self.busy = false;
        Ok(outcome)
    }

    async fn run_send(&mut self, text: &str) -> SendOutcome {
        let session_id = match self.active_session_id.clone() {
            Some(id) => id,
            None => match self.store.create_session(DEFAULT_SESSION_NAME).await {
                Ok(session) => {
                    let id = session.id.clone();
                    self.sessions.insert(0, session);
                    self.active_session_id = Some(id.clone());
                    self.messages.clear();
                    id
                }
                Err(e) => {
                    tracing::error!("Failed to create session: {}", e);
                    return SendOutcome::Interrupted;
                }
            },
        };

        // Optimistic user message
        let local_user = self.push_local(&session_id, text, Sender::User);
        match self.store.append_message(&session_id, text, Sender::User).await {
            Ok(stored) => self.confirm(&local_user, stored),
            Err(e) => {
                tracing::error!("Error sending message: {}", e);
                return SendOutcome::Interrupted;
            }
        }

        let needs_name = self
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .is_some_and(|s| s.name == DEFAULT_SESSION_NAME);
        if needs_name {
            let name = derive_name(text);
            if let Err(e) = self.store.rename_session(&session_id, &name).await {
                tracing::error!("Error renaming session {}: {}", session_id, e);
                return SendOutcome::Interrupted;
            }
            if let Some(session) = self.sessions.iter_mut().find(|s| s.id == session_id) {
                session.name = name;
                session.updated_at = now();
            }
            sort_sessions(&mut self.sessions);
        }

        let reply_text = reply_or_fallback(self.assistant.reply(text).await);

        let local_bot = self.push_local(&session_id, &reply_text, Sender::Bot);
        match self
            .store
            .append_message(&session_id, &reply_text, Sender::Bot)
            .await
        {
            Ok(stored) => {
                self.confirm(&local_bot, stored.clone());
                SendOutcome::Replied {
                    reply: stored,
                    persisted: true,
                }
            }
            Err(e) => {
                tracing::error!("Error saving bot reply: {}", e);
                let reply = self
                    .messages
                    .iter()
                    .find(|m| m.id == local_bot)
                    .cloned()
                    .unwrap_or_else(|| local_message(&session_id, &reply_text, Sender::Bot));
                SendOutcome::Replied {
                    reply,
                    persisted: false,
                }
            }
        }
    }

    /// Append an unconfirmed local message and return its local id
    fn push_local(&mut self, session_id: &str, text: &str, sender: Sender) -> String {
        let message = local_message(session_id, text, sender);
        let id = message.id.clone();
        self.pending.insert(id.clone());
        self.messages.push(message);
        id
    }

    /// Replace a local message with the row the store returned
    fn confirm(&mut self, local_id: &str, stored: ChatMessage) {
        self.pending.remove(local_id);
        if let Some(session) = self.sessions.iter_mut().find(|s| s.id == stored.session_id) {
            if stored.created_at > session.updated_at {
                session.updated_at = stored.created_at;
            }
        }
        sort_sessions(&mut self.sessions);

        match self.messages.iter_mut().find(|m| m.id == local_id) {
            Some(slot) => *slot = stored,
            None => tracing::debug!("Local message {} no longer in transcript", local_id),
        }
    }

    /// Delete a session and everything in it
    ///
    /// Deleting the active session activates the most recently updated
    /// remaining one, or clears the transcript when none remain. Returns
    /// false when the store refused the deletion; local state is then
    /// unchanged.
    pub async fn delete_session(&mut self, id: &str) -> Result<bool> {
        self.ensure_idle("delete_session")?;

        self.busy = true;
        let deleted = self.store.delete_session(id).await;
        if let Err(e) = deleted {
            self.busy = false;
            tracing::error!("Error deleting session {}: {}", id, e);
            return Ok(false);
        }

        self.sessions.retain(|s| s.id != id);

        if self.active_session_id.as_deref() == Some(id) {
            let next = self
                .sessions
                .iter()
                .max_by_key(|s| s.updated_at)
                .map(|s| s.id.clone());
            self.messages.clear();
            self.pending.clear();
            self.active_session_id = next.clone();
            if let Some(next) = next {
                self.load_messages(&next).await;
            }
        }

        self.busy = false;
        tracing::info!("Deleted session {}", id);
        Ok(true)
    }

    /// Rename a session in the store and in the local list
    ///
    /// Returns false when the store refused the rename.
    ///
    /// # Errors
    ///
    /// Returns [`ChatbookError::NotFound`] when `id` is not in the session list
    pub async fn rename_session(&mut self, id: &str, name: &str) -> Result<bool> {
        self.ensure_idle("rename_session")?;
        if !self.sessions.iter().any(|s| s.id == id) {
            return Err(ChatbookError::NotFound(format!("session {}", id)).into());
        }

        self.busy = true;
        let result = self.store.rename_session(id, name).await;
        self.busy = false;

        match result {
            Ok(()) => {
                if let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) {
                    session.name = name.to_string();
                    session.updated_at = now();
                }
                sort_sessions(&mut self.sessions);
                Ok(true)
            }
            Err(e) => {
                tracing::error!("Error renaming session {}: {}", id, e);
                Ok(false)
            }
        }
    }

    /// Replace local state with the store's copy
    ///
    /// Keeps the active session when it still exists, otherwise falls back
    /// to the most recently updated one. A deferred new chat (no active
    /// session) stays deferred. Calling it repeatedly has no further effect.
    pub async fn reconcile(&mut self) -> Result<()> {
        self.ensure_idle("reconcile")?;

        self.busy = true;
        match self.store.list_sessions().await {
            Ok(mut sessions) => {
                sort_sessions(&mut sessions);
                self.sessions = sessions;

                let still_present = self
                    .active_session_id
                    .as_deref()
                    .map(|id| self.sessions.iter().any(|s| s.id == id));
                match still_present {
                    Some(true) | None => {}
                    Some(false) => {
                        self.active_session_id = self.sessions.first().map(|s| s.id.clone());
                        self.messages.clear();
                        self.pending.clear();
                    }
                }

                match self.active_session_id.clone() {
                    Some(id) => {
                        self.load_messages(&id).await;
                    }
                    None => {
                        self.messages.clear();
                        self.pending.clear();
                    }
                }
            }
            Err(e) => tracing::error!("Failed to reload sessions: {}", e),
        }
        self.busy = false;
        Ok(())
    }
}

fn local_message(session_id: &str, text: &str, sender: Sender) -> ChatMessage {
    ChatMessage {
        id: format!("local-{}", ulid::Ulid::new()),
        session_id: session_id.to_string(),
        message: text.to_string(),
        sender,
        created_at: now(),
    }
}

/// Most recently updated first; stable for equal timestamps
fn sort_sessions(sessions: &mut [ChatSession]) {
    sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}
