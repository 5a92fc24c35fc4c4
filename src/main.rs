//! Sift CLI binary entry point.

use clap::Parser;
use sift::cli::{Cli, Commands, SavedCommands};
use sift::config::SiftConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match SiftConfig::load() {
        Ok(config) => match cli.command {
            Commands::Ask(args) => sift::cli::commands::handle_ask(config, args).await,
            Commands::Ping => sift::cli::commands::handle_ping(config).await,
            Commands::Saved(saved) => match saved.command {
                SavedCommands::List { user } => {
                    sift::cli::commands::handle_saved_list(config, user).await
                }
                SavedCommands::Delete { id } => {
                    sift::cli::commands::handle_saved_delete(config, &id).await
                }
            },
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
