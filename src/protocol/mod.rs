//! Stream protocol messages.
//!
//! Each frame of the answer stream carries one JSON object. Exactly one of
//! `error`, `done`, `tool_call` or `chunk` decides what it means; see
//! [`decode`] for the precedence rules.

mod codec;

pub use codec::{decode, DecodeError};

use serde::{Deserialize, Serialize};

/// A decoded stream frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Incremental fragment of the final answer.
    Chunk { text: String },
    /// One backend tool invocation.
    ToolCall(ToolCallRecord),
    /// Terminal success.
    Done,
    /// Terminal failure reported by the backend.
    Failure { message: String },
}

impl StreamMessage {
    pub fn chunk(text: impl Into<String>) -> Self {
        Self::Chunk { text: text.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    /// Whether this message ends a session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failure { .. })
    }
}

/// Record of one tool invocation performed by the backend agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub action: String,
    #[serde(default)]
    pub input: serde_json::Value,
}

impl ToolCallRecord {
    pub fn new(name: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: action.into(),
            input: serde_json::Value::Null,
        }
    }

    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = input;
        self
    }

    /// Tool name for display, with a placeholder when the backend sent none.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "Unknown Tool"
        } else {
            &self.name
        }
    }

    /// Action for display, with a placeholder when the backend sent none.
    pub fn display_action(&self) -> &str {
        if self.action.is_empty() {
            "Unknown Action"
        } else {
            &self.action
        }
    }
}
