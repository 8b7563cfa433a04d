//! Chatbook - terminal chat client library
//!
//! This library provides the core functionality for Chatbook: named chat
//! sessions kept in a persistent store, a conversation controller that
//! mediates between the user, the store and an AI assistant, and the
//! account handling that gates access.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `controller`: Conversation state machine (sessions, messages, send flow)
//! - `storage`: Persistent store contract with SQLite and PostgREST backends
//! - `providers`: AI assistant abstraction and the OpenRouter implementation
//! - `auth`: Signup, login and the on-disk signed-in user
//! - `naming`: Session name derivation from the first message
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use chatbook::Config;
//!
//! fn main() -> anyhow::Result<()> {
//!     let cli = chatbook::cli::Cli::parse_args();
//!     let config = Config::load("config/config.yaml", &cli)?;
//!     config.validate()?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod naming;
pub mod providers;
pub mod storage;

// Re-export commonly used types
pub use auth::{AuthContext, AuthService};
pub use config::Config;
pub use controller::{ControllerPhase, ConversationController, SendOutcome};
pub use error::{ChatbookError, Result};
pub use naming::derive_name;
pub use storage::{ChatMessage, ChatSession, Sender, SessionStore, UserStore};
