//! Handlers for CLI subcommands.

use std::io::Write;

use futures::StreamExt;

use crate::config::SiftConfig;
use crate::error::SiftError;
use crate::session::{channel_observer, Notice, SessionController};
use crate::storage::{HttpResponseStore, ResponseStore, SavedResponseDraft};
use crate::types::{ResponseSnapshot, SessionState};

use super::AskArgs;

/// Stream an answer to the terminal.
pub async fn handle_ask(config: SiftConfig, args: AskArgs) -> Result<(), SiftError> {
    let query = args.query_text();
    let mut config = config;
    if let Some(secs) = args.idle_timeout {
        config = config.with_idle_timeout_secs(Some(secs));
    }
    let user_id = args.user.clone().or_else(|| config.user_id.clone());
    if args.save && user_id.is_none() {
        return Err(SiftError::InvalidArgument(
            "--save needs a user id (--user or SIFT_USER_ID)".to_string(),
        ));
    }

    let (observer, mut notifications) = channel_observer();
    let controller = SessionController::from_config(&config)?.with_observer(observer);

    let reachability = controller.probe().await;
    if !reachability.is_reachable() {
        eprintln!("warning: backend at {} may not be available", config.base_url());
    }

    controller.start(query.clone());

    let mut printer = DeltaPrinter::default();
    let mut last = ResponseSnapshot::default();
    while let Some(update) = notifications.next().await {
        print!("{}", printer.delta(&update.snapshot));
        let _ = std::io::stdout().flush();
        for call in &update.snapshot.tool_calls[printer.tool_calls_shown..] {
            eprintln!("\n⚡ {} ({})", call.display_name(), call.display_action());
        }
        printer.tool_calls_shown = update.snapshot.tool_calls.len();

        match &update.notice {
            Some(Notice::Decode { message }) => eprintln!("\nwarning: {message}"),
            Some(Notice::Connection { message }) => eprintln!("\nconnection: {message}"),
            Some(Notice::IdleTimeout { .. }) | None => {}
        }

        let finished = update.state.is_final();
        last = update.snapshot;
        if finished {
            break;
        }
    }
    println!();

    if last.failed() {
        let message = last
            .error_message
            .unwrap_or_else(|| "the search failed".to_string());
        return Err(SiftError::InvalidState(message));
    }
    if controller.state() != SessionState::Succeeded {
        return Err(SiftError::InvalidState("session ended without an answer".to_string()));
    }

    if let (true, Some(user_id)) = (args.save, user_id) {
        let draft = SavedResponseDraft::from_snapshot(&user_id, &query, &last)?;
        let store = HttpResponseStore::from_config(&config)?;
        let id = store.save(&draft).await?;
        eprintln!("Stored answer {id}");
    }
    Ok(())
}

/// Probe the backend.
pub async fn handle_ping(config: SiftConfig) -> Result<(), SiftError> {
    let controller = SessionController::from_config(&config)?;
    match controller.probe().await {
        crate::session::Reachability::Reachable => {
            println!("✅ {} is reachable", config.stream_url());
            Ok(())
        }
        crate::session::Reachability::Unreachable { reason } => Err(SiftError::Connection(
            format!("{} is not reachable: {reason}", config.stream_url()),
        )),
    }
}

/// List stored answers for a user.
pub async fn handle_saved_list(config: SiftConfig, user: Option<String>) -> Result<(), SiftError> {
    let user_id = user.or_else(|| config.user_id.clone()).ok_or_else(|| {
        SiftError::InvalidArgument("a user id is required (--user or SIFT_USER_ID)".to_string())
    })?;
    let store = HttpResponseStore::from_config(&config)?;
    let responses = store.list(&user_id).await?;
    if responses.is_empty() {
        println!("No saved responses found.");
    }
    for response in responses {
        println!(
            "{}  {}  {}",
            response.id,
            response.timestamp.as_deref().unwrap_or("-"),
            response.search_query.as_deref().unwrap_or("(no query)")
        );
    }
    Ok(())
}

/// Delete one stored answer.
pub async fn handle_saved_delete(config: SiftConfig, id: &str) -> Result<(), SiftError> {
    let store = HttpResponseStore::from_config(&config)?;
    store.delete(id).await?;
    println!("Deleted {id}");
    Ok(())
}

/// Tracks how much of a growing snapshot has been printed.
#[derive(Debug, Default)]
struct DeltaPrinter {
    printed: usize,
    tool_calls_shown: usize,
}

impl DeltaPrinter {
    /// Text appended since the last call.
    fn delta<'a>(&mut self, snapshot: &'a ResponseSnapshot) -> &'a str {
        let start = self.printed.min(snapshot.text.len());
        self.printed = snapshot.text.len();
        snapshot.text.get(start..).unwrap_or_default()
    }
}
