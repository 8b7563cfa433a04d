//! Non-interactive session management

use crate::auth::CredentialStore;
use crate::cli::SessionCommand;
use crate::commands::account::require_user;
use crate::commands::render;
use crate::commands::resolve_session;
use crate::commands::special_commands::SessionRef;
use crate::config::Config;
use crate::error::{ChatbookError, Result};
use crate::storage::{open_store, SessionStore};
use colored::Colorize;

/// Handle `chatbook sessions ...`
pub async fn handle_sessions(config: &Config, command: SessionCommand) -> Result<()> {
    let credentials = CredentialStore::from_config(&config.auth)?;
    let user = require_user(&credentials)?;
    tracing::debug!("Managing sessions as {}", user.username);

    let handles = open_store(&config.store)?;
    run_session_command(handles.sessions.as_ref(), command).await
}

/// Execute a session command against `store`
pub async fn run_session_command(store: &dyn SessionStore, command: SessionCommand) -> Result<()> {
    match command {
        SessionCommand::List => {
            let sessions = store.list_sessions().await?;
            render::print_sessions(&sessions, None);
            if !sessions.is_empty() {
                println!(
                    "Use {} to continue a conversation.",
                    "chatbook chat".cyan()
                );
            }
        }
        SessionCommand::Show { target } => {
            let sessions = store.list_sessions().await?;
            let session = resolve_session(&sessions, &SessionRef::parse(&target))?;
            let messages = store.list_messages(&session.id).await?;
            render::print_transcript(Some(session), &messages);
        }
        SessionCommand::Delete { target } => {
            let sessions = store.list_sessions().await?;
            let session = resolve_session(&sessions, &SessionRef::parse(&target))?;
            store.delete_session(&session.id).await?;
            println!(
                "{}",
                format!("Deleted session {} ({})", session.name, render::short_id(&session.id))
                    .green()
            );
        }
        SessionCommand::Rename { target, name } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(
                    ChatbookError::Config("Session name cannot be empty".to_string()).into(),
                );
            }
            let sessions = store.list_sessions().await?;
            let session = resolve_session(&sessions, &SessionRef::parse(&target))?;
            store.rename_session(&session.id, name).await?;
            println!(
                "{}",
                format!("Renamed {} to {}", session.name, name).green()
            );
        }
    }
    Ok(())
}
