//! Accumulated response state.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::protocol::ToolCallRecord;

/// How a response ended, if it has.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TerminalState {
    #[default]
    None,
    Succeeded,
    Failed,
}

/// Point-in-time view of a response.
///
/// A new value is produced for every change; holders of an older snapshot
/// never observe later updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    /// Concatenation of every chunk seen so far, in arrival order.
    pub text: String,
    /// Tool invocations in arrival order.
    pub tool_calls: Vec<ToolCallRecord>,
    pub terminal: TerminalState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ResponseSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.terminal != TerminalState::None
    }

    pub fn succeeded(&self) -> bool {
        self.terminal == TerminalState::Succeeded
    }

    pub fn failed(&self) -> bool {
        self.terminal == TerminalState::Failed
    }
}
