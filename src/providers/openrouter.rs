//! OpenRouter provider implementation
//!
//! Sends each prompt to an OpenAI-compatible `/chat/completions` endpoint
//! together with the configured system prompt. No history is sent.

use crate::config::OpenRouterConfig;
use crate::error::{ChatbookError, Result};
use crate::providers::{Assistant, AssistantError, ChatCompletionRequest, ChatCompletionResponse, Message};

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// OpenRouter chat-completions client
///
/// # Examples
///
/// ```
/// use chatbook::config::OpenRouterConfig;
/// use chatbook::providers::OpenRouterProvider;
///
/// let provider = OpenRouterProvider::new(OpenRouterConfig::default()).unwrap();
/// assert_eq!(provider.model(), "deepseek/deepseek-chat:free");
/// ```
#[derive(Debug, Clone)]
pub struct OpenRouterProvider {
    client: Client,
    config: OpenRouterConfig,
}

impl OpenRouterProvider {
    /// Create a new OpenRouter provider
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("chatbook/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChatbookError::Config(format!("Failed to create HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            tracing::warn!("No OpenRouter API key configured; requests will be unauthenticated");
        }
        tracing::info!(
            "Initialized OpenRouter provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self { client, config })
    }

    /// Model identifier sent with every request
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Assistant for OpenRouterProvider {
    async fn reply(&self, prompt: &str) -> std::result::Result<String, AssistantError> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message::system(self.config.system_prompt.clone()),
                Message::user(prompt),
            ],
        };

        let url = self.completions_url();
        tracing::debug!("Requesting completion from {} (model={})", url, request.model);

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!("Failed to reach OpenRouter: {}", e);
            AssistantError::Transport(e.to_string())
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            tracing::warn!("Failed to read OpenRouter response: {}", e);
            AssistantError::Transport(e.to_string())
        })?;

        match serde_json::from_str::<ChatCompletionResponse>(&body) {
            Ok(completion) => {
                if !status.is_success() {
                    tracing::warn!("OpenRouter returned error {}: {}", status, body);
                }
                completion.first_reply()
            }
            Err(_) if !status.is_success() => {
                tracing::error!("OpenRouter returned error {}: {}", status, body);
                Err(AssistantError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
            Err(e) => {
                tracing::error!("Failed to parse OpenRouter response: {}", e);
                Err(AssistantError::Parse(e.to_string()))
            }
        }
    }
}
