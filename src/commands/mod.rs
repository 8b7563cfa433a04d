/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `account`  - signup, login, logout and whoami
- `chat`     - interactive chat REPL driven by the conversation controller
- `sessions` - non-interactive session management
- `render`   - terminal formatting shared by the handlers
*/

use crate::commands::special_commands::SessionRef;
use crate::error::{ChatbookError, Result};
use crate::storage::ChatSession;

pub mod account;
pub mod chat;
pub mod render;
pub mod sessions;
pub mod special_commands;

/// Find the session a user referred to by list position or id
///
/// Ids may be abbreviated to any prefix that matches exactly one session.
///
/// # Errors
///
/// Returns [`ChatbookError::NotFound`] when nothing, or more than one
/// session, matches
pub fn resolve_session<'a>(sessions: &'a [ChatSession], target: &SessionRef) -> Result<&'a ChatSession> {
    match target {
        SessionRef::Index(n) => n
            .checked_sub(1)
            .and_then(|idx| sessions.get(idx))
            .ok_or_else(|| ChatbookError::NotFound(format!("session #{}", n)).into()),
        SessionRef::Id(id) => {
            if let Some(exact) = sessions.iter().find(|s| &s.id == id) {
                return Ok(exact);
            }
            let mut matches = sessions.iter().filter(|s| s.id.starts_with(id.as_str()));
            match (matches.next(), matches.next()) {
                (Some(only), None) => Ok(only),
                (Some(_), Some(_)) => Err(ChatbookError::NotFound(format!(
                    "session id prefix {} is ambiguous",
                    id
                ))
                .into()),
                _ => Err(ChatbookError::NotFound(format!("session {}", id)).into()),
            }
        }
    }
}
