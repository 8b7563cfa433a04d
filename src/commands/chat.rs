//! Interactive chat mode handler
//!
//! Signs the user in from the credentials file, initializes a
//! [`ConversationController`] and runs a readline loop. Plain lines are sent
//! to the assistant; slash commands manage sessions.

use crate::auth::{AuthContext, CredentialStore};
use crate::commands::account::require_user;
use crate::commands::render;
use crate::commands::resolve_session;
use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
use crate::config::Config;
use crate::controller::{ConversationController, SendOutcome};
use crate::error::{ChatbookError, Result};
use crate::providers::create_provider;
use crate::storage::open_store;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Start interactive chat mode
///
/// # Errors
///
/// Returns error if nobody is signed in, or the store or provider cannot be
/// set up
pub async fn run_chat(config: Config) -> Result<()> {
    tracing::info!("Starting interactive chat mode");

    let credentials = CredentialStore::from_config(&config.auth)?;
    let user = require_user(&credentials)?;

    let handles = open_store(&config.store)?;
    let assistant = create_provider(&config.provider)?;

    let mut controller = ConversationController::new(handles.sessions, assistant, user.clone());
    controller.initialize().await?;

    print_welcome_banner(&user);
    render::print_sessions(controller.sessions(), controller.active_session_id());
    render::print_transcript(controller.active_session(), controller.messages());

    let mut rl = DefaultEditor::new()?;
    let known_user = Some(user);

    loop {
        if signed_in_elsewhere(&credentials, known_user.as_ref()) {
            println!(
                "{}",
                "Sign-in changed in another session; leaving chat.".yellow()
            );
            break;
        }

        let prompt = format_prompt(&controller);
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if let Err(e) = rl.add_history_entry(trimmed) {
                    tracing::debug!("Failed to add history entry: {}", e);
                }

                let command = match parse_special_command(trimmed) {
                    Ok(command) => command,
                    Err(e) => {
                        eprintln!("{}\n", e.to_string().red());
                        continue;
                    }
                };

                match command {
                    SpecialCommand::Exit => break,
                    SpecialCommand::None => send(&mut controller, trimmed).await?,
                    other => {
                        if let Err(e) = handle_special(&mut controller, other).await {
                            if is_user_error(&e) {
                                eprintln!("{}\n", e.to_string().red());
                            } else {
                                return Err(e);
                            }
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                tracing::error!("Readline error: {:?}", err);
                break;
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn signed_in_elsewhere(credentials: &CredentialStore, known: Option<&AuthContext>) -> bool {
    match credentials.changed_since(known) {
        Ok(changed) => changed,
        Err(e) => {
            tracing::warn!("Could not read credentials file: {}", e);
            false
        }
    }
}

/// Errors the user caused and can correct from the prompt
fn is_user_error(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ChatbookError>(),
        Some(ChatbookError::NotFound(_)) | Some(ChatbookError::InvalidState(_))
    )
}

fn format_prompt(controller: &ConversationController) -> String {
    let name = controller
        .active_session()
        .map(|s| s.name.clone())
        .unwrap_or_else(|| "new chat".to_string());
    format!("[{}] >> ", name.cyan())
}

async fn send(controller: &mut ConversationController, text: &str) -> Result<()> {
    println!("{}", "Thinking...".dimmed());
    match controller.send_message(text).await? {
        SendOutcome::Replied { reply, persisted } => {
            render::print_message(&reply);
            if !persisted {
                println!("{}\n", "(reply not saved; /reload to resync)".dimmed());
            }
        }
        SendOutcome::Interrupted => {
            println!("{}\n", "(message not saved; /reload to resync)".dimmed());
        }
        SendOutcome::Skipped => {}
    }
    Ok(())
}

async fn handle_special(controller: &mut ConversationController, command: SpecialCommand) -> Result<()> {
    match command {
        SpecialCommand::NewChat => {
            controller.start_new_chat()?;
            println!("{}\n", "Started a new chat.".green());
        }
        SpecialCommand::ListSessions => {
            render::print_sessions(controller.sessions(), controller.active_session_id());
        }
        SpecialCommand::Switch(target) => {
            let id = resolve_session(controller.sessions(), &target)?.id.clone();
            controller.switch_session(&id).await?;
            render::print_transcript(controller.active_session(), controller.messages());
        }
        SpecialCommand::Delete(target) => {
            let session = resolve_session(controller.sessions(), &target)?.clone();
            if controller.delete_session(&session.id).await? {
                println!("{}\n", format!("Deleted {}.", session.name).green());
                render::print_transcript(controller.active_session(), controller.messages());
            } else {
                eprintln!("{}\n", "Could not delete the session.".red());
            }
        }
        SpecialCommand::Rename(name) => {
            let id = controller
                .active_session_id()
                .map(str::to_string)
                .ok_or_else(|| {
                    ChatbookError::InvalidState(
                        "No active session to rename; send a message first".to_string(),
                    )
                })?;
            if controller.rename_session(&id, &name).await? {
                println!("{}\n", format!("Renamed to {}.", name).green());
            } else {
                eprintln!("{}\n", "Could not rename the session.".red());
            }
        }
        SpecialCommand::ShowHistory => {
            render::print_transcript(controller.active_session(), controller.messages());
        }
        SpecialCommand::Reload => {
            controller.reconcile().await?;
            render::print_sessions(controller.sessions(), controller.active_session_id());
            render::print_transcript(controller.active_session(), controller.messages());
        }
        SpecialCommand::WhoAmI => {
            let user = controller.user();
            println!("{} ({})\n", user.username.bold(), user.id.dimmed());
        }
        SpecialCommand::Help => print_help(),
        SpecialCommand::Exit | SpecialCommand::None => {}
    }
    Ok(())
}

fn print_welcome_banner(user: &AuthContext) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Chatbook - Your AI Assistant                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    println!("Signed in as {}", user.username.bold());
    println!("Type '/help' for available commands, 'exit' to quit\n");
}
