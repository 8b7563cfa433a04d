//! Command-line interface definition for Chatbook
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for accounts, interactive chat and session management.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chatbook - chat with an AI assistant from the terminal
///
/// Conversations are kept as named sessions in a persistent store and can be
/// resumed, renamed and deleted.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatbook")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the SQLite database file
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Chatbook
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create an account
    Signup {
        /// Username to register
        username: String,

        /// Password (prompted when omitted)
        #[arg(long, env = "CHATBOOK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign in; later commands act as this user
    Login {
        /// Username to sign in as
        username: String,

        /// Password (prompted when omitted)
        #[arg(long, env = "CHATBOOK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Start interactive chat mode
    Chat,

    /// Manage chat sessions
    Sessions {
        /// Session management subcommand
        #[command(subcommand)]
        command: SessionCommand,
    },
}

/// Session management subcommands
///
/// Sessions are addressed by their position in `sessions list` or by id
/// (any unique prefix).
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// List sessions, most recently active first
    List,

    /// Print the messages of a session
    Show {
        /// Session number or id
        target: String,
    },

    /// Delete a session and all of its messages
    Delete {
        /// Session number or id
        target: String,
    },

    /// Rename a session
    Rename {
        /// Session number or id
        target: String,

        /// New name
        name: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
