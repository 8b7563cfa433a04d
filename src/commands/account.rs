//! Account commands: signup, login, logout and whoami

use crate::auth::{AuthContext, AuthService, CredentialStore};
use crate::config::Config;
use crate::error::{ChatbookError, Result};
use crate::storage::open_store;
use colored::Colorize;

/// Build the auth service for the configured store and credentials file
pub fn auth_service(config: &Config) -> Result<AuthService> {
    let handles = open_store(&config.store)?;
    let credentials = CredentialStore::from_config(&config.auth)?;
    Ok(AuthService::new(
        handles.users,
        credentials,
        config.auth.bcrypt_cost,
    ))
}

/// The signed-in user, or an error telling the user to log in
pub fn require_user(credentials: &CredentialStore) -> Result<AuthContext> {
    credentials.load()?.ok_or_else(|| {
        ChatbookError::Authentication(
            "Not signed in. Run `chatbook login <username>` first.".to_string(),
        )
        .into()
    })
}

fn read_password(supplied: Option<String>) -> Result<String> {
    if let Some(password) = supplied {
        return Ok(password);
    }

    // No hidden-input prompt is available; warn before echoing
    let mut rl = rustyline::DefaultEditor::new()?;
    let password = rl.readline("Password (input is visible): ")?;
    Ok(password.trim_end_matches(['\r', '\n']).to_string())
}

fn validate_username(username: &str) -> Result<&str> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ChatbookError::Signup("Username cannot be empty.".to_string()).into());
    }
    Ok(username)
}

/// Create an account
pub async fn signup(config: &Config, username: &str, password: Option<String>) -> Result<()> {
    let username = validate_username(username)?;
    let password = read_password(password)?;
    if password.is_empty() {
        return Err(ChatbookError::Signup("Password cannot be empty.".to_string()).into());
    }

    auth_service(config)?.signup(username, &password).await?;
    println!(
        "{} Run {} to sign in.",
        format!("Account {} created.", username).green(),
        format!("chatbook login {}", username).cyan()
    );
    Ok(())
}

/// Sign in and remember the user for later commands
pub async fn login(config: &Config, username: &str, password: Option<String>) -> Result<()> {
    let password = read_password(password)?;
    let context = auth_service(config)?
        .login(username.trim(), &password)
        .await?;
    println!("{}", format!("Signed in as {}.", context.username).green());
    Ok(())
}

/// Forget the signed-in user
pub fn logout(config: &Config) -> Result<()> {
    let credentials = CredentialStore::from_config(&config.auth)?;
    let previous = credentials.load()?;
    credentials.clear()?;

    match previous {
        Some(user) => println!("{}", format!("Signed out {}.", user.username).green()),
        None => println!("{}", "Not signed in.".yellow()),
    }
    Ok(())
}

/// Show the signed-in user
pub fn whoami(config: &Config) -> Result<()> {
    let credentials = CredentialStore::from_config(&config.auth)?;
    match credentials.load()? {
        Some(user) => println!("{} ({})", user.username.bold(), user.id.dimmed()),
        None => println!("{}", "Not signed in.".yellow()),
    }
    Ok(())
}
