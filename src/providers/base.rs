//! Assistant trait and the chat-completions wire types
//!
//! The assistant is stateless: each call sends a system prompt and the single
//! user prompt, and receives one reply. Failures are reported as
//! [`AssistantError`] so the conversation controller can substitute the
//! fixed fallback texts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reply text used when the endpoint answered without any content
pub const EMPTY_REPLY_TEXT: &str = "I didn't understand that.";

/// Reply text used when the endpoint could not be reached or failed
pub const FAILURE_REPLY_TEXT: &str = "Something went wrong.";

/// Failure of a single assistant call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssistantError {
    /// Connection, TLS or timeout failure
    #[error("Assistant request failed: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status
    #[error("Assistant returned error {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body as text
        body: String,
    },

    /// The response body was not a chat completion
    #[error("Failed to parse assistant response: {0}")]
    Parse(String),

    /// The completion carried no usable content
    #[error("Assistant reply was empty")]
    EmptyReply,
}

impl AssistantError {
    /// Text stored as the bot message in place of a real reply
    ///
    /// # Examples
    ///
    /// ```
    /// use chatbook::providers::AssistantError;
    ///
    /// assert_eq!(AssistantError::EmptyReply.fallback_text(), "I didn't understand that.");
    /// assert_eq!(
    ///     AssistantError::Transport("timed out".into()).fallback_text(),
    ///     "Something went wrong."
    /// );
    /// ```
    pub fn fallback_text(&self) -> &'static str {
        match self {
            Self::EmptyReply => EMPTY_REPLY_TEXT,
            _ => FAILURE_REPLY_TEXT,
        }
    }
}

/// Collapse an assistant result into the text that gets stored
pub fn reply_or_fallback(result: std::result::Result<String, AssistantError>) -> String {
    match result {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Assistant call failed: {}", e);
            e.fallback_text().to_string()
        }
    }
}

/// Message structure sent to the chat-completions endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (system, user, assistant)
    #[serde(default)]
    pub role: String,
    /// Content of the message
    #[serde(default)]
    pub content: Option<String>,
}

impl Message {
    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
        }
    }

    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use chatbook::providers::Message;
    ///
    /// let msg = Message::user("Hello, assistant!");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
        }
    }
}

/// Body of a chat-completions request
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    /// Model identifier
    pub model: String,
    /// System prompt followed by the user prompt
    pub messages: Vec<Message>,
}

/// Body of a chat-completions response; only the fields read are modelled
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    /// Candidate completions; the first is used
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// One candidate completion
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// Generated message
    #[serde(default)]
    pub message: Option<Message>,
}

impl ChatCompletionResponse {
    /// Trimmed content of the first choice
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::EmptyReply`] when there is no choice or the
    /// content is missing or blank
    pub fn first_reply(&self) -> std::result::Result<String, AssistantError> {
        self.choices
            .first()
            .and_then(|choice| choice.message.as_ref())
            .and_then(|message| message.content.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or(AssistantError::EmptyReply)
    }
}

/// Produces one reply for one prompt
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use chatbook::providers::{Assistant, AssistantError};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Assistant for Echo {
///     async fn reply(&self, prompt: &str) -> Result<String, AssistantError> {
///         Ok(prompt.to_string())
///     }
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Ask the assistant for a reply to `prompt`
    ///
    /// The returned text is trimmed and non-empty.
    async fn reply(&self, prompt: &str) -> std::result::Result<String, AssistantError>;
}
