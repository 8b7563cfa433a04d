//! Assistant providers
//!
//! This module contains the assistant abstraction and the OpenRouter
//! implementation.

pub mod base;
pub mod openrouter;

pub use base::{
    reply_or_fallback, Assistant, AssistantError, ChatCompletionRequest, ChatCompletionResponse,
    Choice, Message, EMPTY_REPLY_TEXT, FAILURE_REPLY_TEXT,
};
pub use openrouter::OpenRouterProvider;

#[cfg(test)]
pub use base::MockAssistant;

use crate::config::ProviderConfig;
use crate::error::{ChatbookError, Result};
use std::sync::Arc;

/// Create the assistant selected by `config.provider_type`
///
/// # Errors
///
/// Returns error if provider type is invalid or initialization fails
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn Assistant>> {
    match config.provider_type.as_str() {
        "openrouter" => Ok(Arc::new(OpenRouterProvider::new(
            config.openrouter.clone(),
        )?)),
        other => Err(ChatbookError::Config(format!("Unknown provider type: {}", other)).into()),
    }
}
