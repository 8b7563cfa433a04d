//! Hosted backend speaking the PostgREST protocol
//!
//! Tables are reached at `{url}/rest/v1/<table>`. Row filters use the
//! PostgREST operator syntax (`id=eq.<value>`) and ordering uses
//! `order=<column>.<asc|desc>`. Timestamp columns are expected to be
//! `timestamptz` so rows carry an explicit offset.

use crate::config::PostgrestConfig;
use crate::error::{ChatbookError, Result};
use crate::storage::types::{now, ChatMessage, ChatSession, Sender, UserRecord};
use crate::storage::{SessionStore, UserStore};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Postgres error code for a foreign key violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Error body returned by PostgREST for non-2xx responses
#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Session and user store backed by a PostgREST endpoint
///
/// # Examples
///
/// ```
/// use chatbook::config::PostgrestConfig;
/// use chatbook::storage::PostgrestStore;
///
/// let config = PostgrestConfig {
///     url: Some("https://project.example.co".to_string()),
///     api_key: Some("anon-key".to_string()),
///     timeout_seconds: 30,
/// };
/// let store = PostgrestStore::new(config).unwrap();
/// assert_eq!(store.base_url(), "https://project.example.co");
/// ```
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl PostgrestStore {
    /// Create a store for the configured endpoint
    ///
    /// # Errors
    ///
    /// Returns error if no url is configured or the HTTP client cannot be built
    pub fn new(config: PostgrestConfig) -> Result<Self> {
        let url = config.url.ok_or_else(|| {
            ChatbookError::Config("store.postgrest.url is required for the postgrest backend".to_string())
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("chatbook/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChatbookError::Store(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = url.trim_end_matches('/').to_string();
        tracing::info!("Initialized PostgREST store: url={}", base_url);

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
        })
    }

    /// Endpoint the store talks to, without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        tracing::debug!("PostgREST {} {}", method, url);

        let mut builder = self.client.request(method.clone(), url);
        if let Some(key) = &self.api_key {
            builder = builder.header("apikey", key).bearer_auth(key);
        }
        if method == Method::POST || method == Method::PATCH {
            builder = builder.header("Prefer", "return=representation");
        }
        builder
    }

    async fn execute(&self, builder: RequestBuilder, what: &str) -> Result<Response> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!("PostgREST request failed ({}): {}", what, e);
            ChatbookError::Store(format!("Failed to {}: {}", what, e))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!("PostgREST returned error {} ({}): {}", status, what, body);

        let parsed: Option<PostgrestErrorBody> = serde_json::from_str(&body).ok();
        match parsed {
            Some(PostgrestErrorBody {
                code: Some(code),
                message,
            }) if code == FOREIGN_KEY_VIOLATION => Err(ChatbookError::NotFound(
                message.unwrap_or_else(|| "referenced row does not exist".to_string()),
            )
            .into()),
            Some(PostgrestErrorBody {
                message: Some(message),
                ..
            }) => Err(ChatbookError::Store(message).into()),
            _ => Err(ChatbookError::Store(format!("HTTP {}: {}", status, body)).into()),
        }
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<Vec<T>> {
        let response = self.execute(builder, what).await?;
        let rows = response.json::<Vec<T>>().await.map_err(|e| {
            tracing::error!("Failed to parse PostgREST response ({}): {}", what, e);
            ChatbookError::Store(format!("Failed to parse response to {}: {}", what, e))
        })?;
        Ok(rows)
    }

    async fn fetch_one<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        self.fetch_rows(builder, what)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ChatbookError::Store(format!("No row returned to {}", what)).into())
    }
}

#[async_trait]
impl SessionStore for PostgrestStore {
    async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        let builder = self
            .request(Method::GET, "chat_sessions")
            .query(&[("select", "*"), ("order", "updated_at.desc")]);
        self.fetch_rows(builder, "list sessions").await
    }

    async fn create_session(&self, name: &str) -> Result<ChatSession> {
        let builder = self
            .request(Method::POST, "chat_sessions")
            .json(&json!([{ "name": name }]));
        self.fetch_one(builder, "create session").await
    }

    async fn rename_session(&self, id: &str, name: &str) -> Result<()> {
        let builder = self
            .request(Method::PATCH, "chat_sessions")
            .query(&[("id", format!("eq.{}", id))])
            .json(&json!({ "name": name }));
        let updated: Vec<ChatSession> = self.fetch_rows(builder, "rename session").await?;

        if updated.is_empty() {
            return Err(ChatbookError::NotFound(format!("session {}", id)).into());
        }
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> Result<()> {
        let messages = self
            .request(Method::DELETE, "messages")
            .query(&[("session_id", format!("eq.{}", id))]);
        self.execute(messages, "delete messages").await?;

        let session = self
            .request(Method::DELETE, "chat_sessions")
            .query(&[("id", format!("eq.{}", id))]);
        self.execute(session, "delete session").await?;
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let builder = self.request(Method::GET, "messages").query(&[
            ("select", "*".to_string()),
            ("session_id", format!("eq.{}", session_id)),
            ("order", "created_at.asc".to_string()),
        ]);
        self.fetch_rows(builder, "list messages").await
    }

    async fn append_message(
        &self,
        session_id: &str,
        text: &str,
        sender: Sender,
    ) -> Result<ChatMessage> {
        let insert = self.request(Method::POST, "messages").json(&json!([{
            "session_id": session_id,
            "message": text,
            "sender": sender,
        }]));
        let message: ChatMessage = self.fetch_one(insert, "append message").await?;

        let touch = self
            .request(Method::PATCH, "chat_sessions")
            .query(&[("id", format!("eq.{}", session_id))])
            .json(&json!({ "updated_at": now() }));
        if let Err(e) = self.execute(touch, "touch session").await {
            tracing::warn!(
                "Message {} stored but session {} was not touched: {}",
                message.id,
                session_id,
                e
            );
        }

        Ok(message)
    }
}

#[async_trait]
impl UserStore for PostgrestStore {
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>> {
        let builder = self.request(Method::GET, "users").query(&[
            ("select", "*".to_string()),
            ("username", format!("eq.{}", username)),
        ]);
        let users: Vec<UserRecord> = self.fetch_rows(builder, "find user").await?;
        Ok(users.into_iter().next())
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<UserRecord> {
        let builder = self.request(Method::POST, "users").json(&json!([{
            "username": username,
            "password_hash": password_hash,
        }]));
        self.fetch_one(builder, "create user").await
    }
}
