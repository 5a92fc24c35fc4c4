//! Folding stream messages into a response snapshot.

use futures::stream::Stream;
use futures::StreamExt;

use crate::protocol::StreamMessage;
use crate::types::{ResponseSnapshot, TerminalState};

/// Apply one message to a snapshot, returning the next snapshot.
///
/// Once the snapshot is terminal every further message is ignored.
pub fn apply(current: ResponseSnapshot, message: StreamMessage) -> ResponseSnapshot {
    if current.is_terminal() {
        return current;
    }

    let mut next = current;
    match message {
        StreamMessage::Chunk { text } => next.text.push_str(&text),
        StreamMessage::ToolCall(record) => next.tool_calls.push(record),
        StreamMessage::Done => next.terminal = TerminalState::Succeeded,
        StreamMessage::Failure { message } => {
            next.terminal = TerminalState::Failed;
            next.error_message = Some(message);
        }
    }
    next
}

/// Owner of a snapshot that applies messages in place.
#[derive(Debug, Clone, Default)]
pub struct ResponseAccumulator {
    snapshot: ResponseSnapshot,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a message and return the resulting snapshot.
    pub fn apply(&mut self, message: StreamMessage) -> &ResponseSnapshot {
        let current = std::mem::take(&mut self.snapshot);
        self.snapshot = apply(current, message);
        &self.snapshot
    }

    pub fn snapshot(&self) -> &ResponseSnapshot {
        &self.snapshot
    }

    pub fn is_terminal(&self) -> bool {
        self.snapshot.is_terminal()
    }

    pub fn into_snapshot(self) -> ResponseSnapshot {
        self.snapshot
    }
}

/// Collect a stream of messages into its final snapshot.
///
/// Stops reading at the first terminal message.
pub async fn collect_messages<S>(stream: S) -> ResponseSnapshot
where
    S: Stream<Item = StreamMessage>,
{
    futures::pin_mut!(stream);
    let mut accumulator = ResponseAccumulator::new();
    while let Some(message) = stream.next().await {
        if accumulator.apply(message).is_terminal() {
            break;
        }
    }
    accumulator.into_snapshot()
}
