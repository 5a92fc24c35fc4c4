//! Session identity and lifecycle types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::snapshot::{ResponseSnapshot, TerminalState};

/// Unique session identifier, one per `start()` call.
pub type SessionId = Uuid;

/// Session lifecycle state.
///
/// `Idle -> Connecting -> Streaming -> {Succeeded | Failed}`, with
/// `Superseded` and `Stopped` as early exits from `Connecting`/`Streaming`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Succeeded,
    Failed,
    Superseded,
    Stopped,
}

impl SessionState {
    /// Whether no further change can happen to this session.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Superseded | Self::Stopped
        )
    }

    /// State implied by a snapshot's terminal marker, if any.
    pub fn from_terminal(terminal: TerminalState) -> Option<Self> {
        match terminal {
            TerminalState::None => None,
            TerminalState::Succeeded => Some(Self::Succeeded),
            TerminalState::Failed => Some(Self::Failed),
        }
    }
}

/// Current state plus accumulated response of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub snapshot: ResponseSnapshot,
}

impl SessionStatus {
    pub fn connecting() -> Self {
        Self {
            state: SessionState::Connecting,
            snapshot: ResponseSnapshot::default(),
        }
    }
}
