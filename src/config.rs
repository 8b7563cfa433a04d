//! Configuration management for Chatbook
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::auth::password;
use crate::error::{ChatbookError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Chatbook
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Assistant provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Persistent store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Account and credential configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Provider configuration
///
/// Specifies which assistant provider to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// OpenRouter configuration
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
}

fn default_provider_type() -> String {
    "openrouter".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            openrouter: OpenRouterConfig::default(),
        }
    }
}

/// OpenRouter provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer token; usually supplied through `OPENROUTER_API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// System prompt sent before every user prompt
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Request timeout
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

fn default_api_base() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_model() -> String {
    "deepseek/deepseek-chat:free".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful AI assistant.".to_string()
}

fn default_provider_timeout() -> u64 {
    60
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            api_key: None,
            system_prompt: default_system_prompt(),
            timeout_seconds: default_provider_timeout(),
        }
    }
}

/// Persistent store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend to use: `sqlite` or `postgrest`
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Database file for the sqlite backend; defaults to the data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite_path: Option<PathBuf>,

    /// Settings for the postgrest backend
    #[serde(default)]
    pub postgrest: PostgrestConfig,
}

fn default_backend() -> String {
    "sqlite".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            sqlite_path: None,
            postgrest: PostgrestConfig::default(),
        }
    }
}

/// PostgREST backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgrestConfig {
    /// Project URL; tables live under `/rest/v1/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Key sent as both `apikey` and bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout
    #[serde(default = "default_store_timeout")]
    pub timeout_seconds: u64,
}

fn default_store_timeout() -> u64 {
    30
}

impl Default for PostgrestConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_seconds: default_store_timeout(),
        }
    }
}

/// Account and credential configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// File holding the signed-in user; defaults to the data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<PathBuf>,

    /// bcrypt work factor used when hashing new passwords
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

fn default_bcrypt_cost() -> u32 {
    10
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_path: None,
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

/// Per-user data directory holding the database and credentials file
///
/// # Errors
///
/// Returns error if no home directory can be determined
pub fn default_data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "chatbook", "chatbook").ok_or_else(|| {
        ChatbookError::Config("Unable to determine a data directory".to_string())
    })?;
    Ok(dirs.data_dir().to_path_buf())
}

impl Config {
    /// Load configuration from file, environment, and CLI
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatbookError::Config(format!("Failed to read {}: {}", path, e)))?;
        let config: Config = serde_yaml::from_str(&contents)?;
        tracing::debug!("Loaded configuration from {}", path);
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        // Provider overrides
        if let Ok(provider_type) = std::env::var("CHATBOOK_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(model) = std::env::var("CHATBOOK_MODEL") {
            self.provider.openrouter.model = model;
        }

        if let Ok(api_base) = std::env::var("CHATBOOK_API_BASE") {
            self.provider.openrouter.api_base = api_base;
        }

        if let Ok(api_key) = std::env::var("OPENROUTER_API_KEY") {
            if !api_key.is_empty() {
                self.provider.openrouter.api_key = Some(api_key);
            }
        }

        if let Ok(timeout) = std::env::var("CHATBOOK_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.provider.openrouter.timeout_seconds = value;
                self.store.postgrest.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid CHATBOOK_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        // Store overrides
        if let Ok(backend) = std::env::var("CHATBOOK_STORE_BACKEND") {
            self.store.backend = backend;
        }

        if let Ok(db_path) = std::env::var("CHATBOOK_DB") {
            self.store.sqlite_path = Some(PathBuf::from(db_path));
        }

        if let Ok(url) = std::env::var("CHATBOOK_POSTGREST_URL") {
            self.store.postgrest.url = Some(url);
        }

        if let Ok(key) = std::env::var("CHATBOOK_POSTGREST_API_KEY") {
            self.store.postgrest.api_key = Some(key);
        }

        // Auth overrides
        if let Ok(path) = std::env::var("CHATBOOK_CREDENTIALS") {
            self.auth.credentials_path = Some(PathBuf::from(path));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(db_path) = &cli.db {
            tracing::debug!("Using database override from CLI: {}", db_path.display());
            self.store.sqlite_path = Some(db_path.clone());
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let valid_providers = ["openrouter"];
        if !valid_providers.contains(&self.provider.provider_type.as_str()) {
            return Err(ChatbookError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        let openrouter = &self.provider.openrouter;
        if openrouter.model.trim().is_empty() {
            return Err(ChatbookError::Config("Model cannot be empty".to_string()).into());
        }
        validate_http_url("provider.openrouter.api_base", &openrouter.api_base)?;
        if openrouter.timeout_seconds == 0 {
            return Err(ChatbookError::Config(
                "provider.openrouter.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        let valid_backends = ["sqlite", "postgrest"];
        if !valid_backends.contains(&self.store.backend.as_str()) {
            return Err(ChatbookError::Config(format!(
                "Invalid store backend: {}. Must be one of: {}",
                self.store.backend,
                valid_backends.join(", ")
            ))
            .into());
        }

        if self.store.backend == "postgrest" {
            let url = self.store.postgrest.url.as_deref().ok_or_else(|| {
                ChatbookError::Config(
                    "store.postgrest.url is required for the postgrest backend".to_string(),
                )
            })?;
            validate_http_url("store.postgrest.url", url)?;
            if self.store.postgrest.timeout_seconds == 0 {
                return Err(ChatbookError::Config(
                    "store.postgrest.timeout_seconds must be greater than 0".to_string(),
                )
                .into());
            }
        }

        if !(password::MIN_COST..=password::MAX_COST).contains(&self.auth.bcrypt_cost) {
            return Err(ChatbookError::Config(format!(
                "auth.bcrypt_cost must be between {} and {}",
                password::MIN_COST,
                password::MAX_COST
            ))
            .into());
        }

        Ok(())
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| ChatbookError::Config(format!("{} is not a valid URL: {}", field, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ChatbookError::Config(format!(
            "{} must use http or https, got {}",
            field, other
        ))
        .into()),
    }
}
