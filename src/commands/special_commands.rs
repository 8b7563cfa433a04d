//! Special commands parser for the chat REPL
//!
//! Lines starting with `/` manage sessions instead of being sent to the
//! assistant. Command words are case-insensitive; arguments keep their case.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// How the user points at a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRef {
    /// 1-based position in the session listing
    Index(usize),
    /// Session id, or a unique prefix of one
    Id(String),
}

impl SessionRef {
    /// Numbers select by position, anything else by id
    ///
    /// # Examples
    ///
    /// ```
    /// use chatbook::commands::special_commands::SessionRef;
    ///
    /// assert_eq!(SessionRef::parse("2"), SessionRef::Index(2));
    /// assert_eq!(SessionRef::parse("9f1c"), SessionRef::Id("9f1c".to_string()));
    /// ```
    pub fn parse(arg: &str) -> Self {
        match arg.parse::<usize>() {
            Ok(n) => Self::Index(n),
            Err(_) => Self::Id(arg.to_string()),
        }
    }
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Leave the current session; the next message starts a new one
    NewChat,

    /// Show the session list
    ListSessions,

    /// Make another session active
    Switch(SessionRef),

    /// Delete a session and its messages
    Delete(SessionRef),

    /// Rename the active session
    Rename(String),

    /// Print the active transcript again
    ShowHistory,

    /// Re-fetch sessions and messages from the store
    Reload,

    /// Show the signed-in user
    WhoAmI,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; send the input to the assistant
    None,
}

fn require_arg<'a>(command: &str, usage: &str, arg: &'a str) -> Result<&'a str, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        })
    } else {
        Ok(arg)
    }
}

fn no_arg(command: &str, value: SpecialCommand, arg: &str) -> Result<SpecialCommand, CommandError> {
    if arg.is_empty() {
        Ok(value)
    } else {
        Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg: arg.to_string(),
        })
    }
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns CommandError::UnknownCommand if input starts with "/" but is not a valid command.
/// Returns CommandError::UnsupportedArgument if a command receives an invalid argument.
/// Returns CommandError::MissingArgument if a command requires an argument but none was provided.
///
/// # Examples
///
/// ```
/// use chatbook::commands::special_commands::{parse_special_command, SessionRef, SpecialCommand};
///
/// assert_eq!(parse_special_command("/new").unwrap(), SpecialCommand::NewChat);
/// assert_eq!(
///     parse_special_command("/switch 2").unwrap(),
///     SpecialCommand::Switch(SessionRef::Index(2))
/// );
/// assert_eq!(
///     parse_special_command("/rename Rust Lifetimes").unwrap(),
///     SpecialCommand::Rename("Rust Lifetimes".to_string())
/// );
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // Bare exit/quit also leave the REPL
    if lower == "exit" || lower == "quit" {
        return Ok(SpecialCommand::Exit);
    }
    if !trimmed.starts_with('/') {
        return Ok(SpecialCommand::None);
    }

    let (word, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word.to_lowercase(), rest.trim()),
        None => (lower.clone(), ""),
    };

    match word.as_str() {
        "/new" => no_arg("/new", SpecialCommand::NewChat, arg),
        "/sessions" | "/list" => no_arg("/sessions", SpecialCommand::ListSessions, arg),
        "/history" => no_arg("/history", SpecialCommand::ShowHistory, arg),
        "/reload" => no_arg("/reload", SpecialCommand::Reload, arg),
        "/whoami" => no_arg("/whoami", SpecialCommand::WhoAmI, arg),
        "/help" | "/?" => no_arg("/help", SpecialCommand::Help, arg),
        "/exit" | "/quit" => Ok(SpecialCommand::Exit),

        "/switch" => {
            let target = require_arg("/switch", "/switch <number|id>", arg)?;
            Ok(SpecialCommand::Switch(SessionRef::parse(target)))
        }
        "/delete" => {
            let target = require_arg("/delete", "/delete <number|id>", arg)?;
            Ok(SpecialCommand::Delete(SessionRef::parse(target)))
        }
        "/rename" => {
            let name = require_arg("/rename", "/rename <new name>", arg)?;
            Ok(SpecialCommand::Rename(name.to_string()))
        }

        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

SESSIONS:
  /new               - Start a new chat (created when you send the first message)
  /sessions          - List sessions, most recent first
  /list              - Same as /sessions
  /switch <n|id>     - Switch to session number <n> or id (prefix) <id>
  /delete <n|id>     - Delete a session and all of its messages
  /rename <name>     - Rename the active session

TRANSCRIPT:
  /history           - Show the active session's messages again
  /reload            - Re-fetch sessions and messages from the store

ACCOUNT:
  /whoami            - Show the signed-in user

SESSION CONTROL:
  /help              - Show this help message
  /?                 - Same as /help
  /exit, exit        - Exit interactive mode
  /quit, quit        - Same as exit

NOTES:
  - Command words are case-insensitive
  - Regular text (not starting with /) is sent to the assistant
  - A new session is named after your first message in it
"#
    );
}
