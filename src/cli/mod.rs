//! CLI entry point for Sift.

pub mod commands;

use clap::{Parser, Subcommand};

/// Sift CLI
#[derive(Parser, Debug)]
#[command(name = "sift", version, about = "Sift: streaming answers from a search agent")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question and stream the answer
    Ask(AskArgs),
    /// Check that the backend answers
    Ping,
    /// Manage stored answers
    Saved(SavedArgs),
}

/// Arguments for the `ask` subcommand.
#[derive(Parser, Debug)]
pub struct AskArgs {
    /// Store the answer once it completes successfully
    #[arg(long)]
    pub save: bool,

    /// User id to store the answer under (overrides SIFT_USER_ID)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Fail if no data arrives for this many seconds
    #[arg(long)]
    pub idle_timeout: Option<u64>,

    /// The question (positional, joined with spaces)
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,
}

impl AskArgs {
    pub fn query_text(&self) -> String {
        self.query.join(" ")
    }
}

/// Arguments for the `saved` subcommand group.
#[derive(Parser, Debug)]
pub struct SavedArgs {
    #[command(subcommand)]
    pub command: SavedCommands,
}

/// Stored-answer subcommands.
#[derive(Subcommand, Debug)]
pub enum SavedCommands {
    /// List stored answers
    List {
        /// User id (overrides SIFT_USER_ID)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Delete a stored answer
    Delete {
        /// Id of the stored answer
        id: String,
    },
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
