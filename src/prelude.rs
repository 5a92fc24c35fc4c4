//! Convenience re-exports for common use.

pub use crate::accumulator::{apply, ResponseAccumulator};
pub use crate::config::SiftConfig;
pub use crate::error::{Result, SiftError};
pub use crate::protocol::{decode, DecodeError, StreamMessage, ToolCallRecord};
pub use crate::session::{
    channel_observer, Notice, Reachability, SessionController, SessionHandle,
    SessionNotification, SessionObserver,
};
pub use crate::storage::{HttpResponseStore, ResponseStore, SavedResponseDraft, UserIdentity};
pub use crate::transport::{StreamTransport, TransportEvent};
pub use crate::types::{ResponseSnapshot, SessionId, SessionState, SessionStatus, TerminalState};
