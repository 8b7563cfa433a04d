//! Chatbook - terminal chat client for an AI assistant
//!
#![doc = "Chatbook - terminal chat client for an AI assistant"]
#![doc = "Main entry point for the chatbook application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chatbook::cli::{Cli, Commands};
use chatbook::commands;
use chatbook::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Signup { username, password } => {
            tracing::info!("Creating account for {}", username);
            commands::account::signup(&config, &username, password).await?;
            Ok(())
        }
        Commands::Login { username, password } => {
            tracing::info!("Signing in as {}", username);
            commands::account::login(&config, &username, password).await?;
            Ok(())
        }
        Commands::Logout => {
            commands::account::logout(&config)?;
            Ok(())
        }
        Commands::Whoami => {
            commands::account::whoami(&config)?;
            Ok(())
        }
        Commands::Chat => {
            commands::chat::run_chat(config).await?;
            Ok(())
        }
        Commands::Sessions { command } => {
            tracing::info!("Starting session management command");
            commands::sessions::handle_sessions(&config, command).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so they never interleave with the chat transcript.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "chatbook=debug" } else { "chatbook=warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
