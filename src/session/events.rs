//! Notifications delivered to the presentation layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::types::{ResponseSnapshot, SessionId, SessionState};

/// Warning or error attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// A frame could not be decoded; the session continues.
    Decode { message: String },
    /// The connection failed; the session is now `Failed`.
    Connection { message: String },
    /// No frame arrived within the idle timeout; the session is now `Failed`.
    IdleTimeout { seconds: u64 },
}

impl Notice {
    /// Whether the session ended because of this notice.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Decode { .. })
    }
}

/// One state change of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionNotification {
    pub session_id: SessionId,
    /// Starts at 1 for each session and increases by one per notification.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub state: SessionState,
    pub snapshot: ResponseSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

/// Callback receiving session notifications.
///
/// Runs on the session task while the controller's single-flight lock is
/// held, so it must return quickly and must not call back into the
/// controller.
pub type SessionObserver = Arc<dyn Fn(SessionNotification) + Send + Sync>;

/// Observer that forwards notifications into an unbounded channel.
pub fn channel_observer() -> (SessionObserver, UnboundedReceiverStream<SessionNotification>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let observer: SessionObserver = Arc::new(move |notification| {
        let _ = tx.send(notification);
    });
    (observer, UnboundedReceiverStream::new(rx))
}

/// Stamps notifications of one session with ids and sequence numbers.
pub(crate) struct NotificationEmitter {
    session_id: SessionId,
    seq: u64,
}

impl NotificationEmitter {
    pub(crate) fn new(session_id: SessionId) -> Self {
        Self { session_id, seq: 0 }
    }

    pub(crate) fn next(
        &mut self,
        state: SessionState,
        snapshot: ResponseSnapshot,
        notice: Option<Notice>,
    ) -> SessionNotification {
        self.seq += 1;
        SessionNotification {
            session_id: self.session_id,
            seq: self.seq,
            timestamp: Utc::now(),
            state,
            snapshot,
            notice,
        }
    }
}
