//! Session controller: one streaming query at a time.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{Notice, NotificationEmitter, SessionObserver};
use super::supervisor::{ConnectivitySupervisor, Reachability};
use crate::accumulator::ResponseAccumulator;
use crate::config::SiftConfig;
use crate::error::SiftError;
use crate::protocol::{decode, StreamMessage};
use crate::transport::{EventSourceTransport, FrameStream, StreamTransport, TransportEvent};
use crate::types::{ResponseSnapshot, SessionId, SessionState, SessionStatus};

/// Drives one streaming session per `start()` call.
///
/// Starting a new query supersedes the previous one: its connection is
/// closed before the new one opens, and it never notifies again. Dropping
/// the controller stops the live session.
pub struct SessionController {
    transport: Arc<dyn StreamTransport>,
    supervisor: Arc<ConnectivitySupervisor>,
    observer: Option<SessionObserver>,
    idle_timeout: Option<Duration>,
}

impl SessionController {
    pub fn new(transport: Arc<dyn StreamTransport>, supervisor: ConnectivitySupervisor) -> Self {
        Self {
            transport,
            supervisor: Arc::new(supervisor),
            observer: None,
            idle_timeout: None,
        }
    }

    /// Controller over the event-stream transport described by `config`.
    pub fn from_config(config: &SiftConfig) -> Result<Self, SiftError> {
        let transport = EventSourceTransport::from_config(config)?;
        let supervisor = ConnectivitySupervisor::from_config(config)?;
        Ok(Self::new(Arc::new(transport), supervisor).with_idle_timeout(config.idle_timeout()))
    }

    pub fn with_observer(mut self, observer: SessionObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Start streaming `query`, superseding any live session.
    ///
    /// Returns immediately; results arrive through the observer and the
    /// returned handle. Must be called from within a tokio runtime.
    pub fn start(&self, query: impl Into<String>) -> SessionHandle {
        let id = Uuid::new_v4();
        let query = query.into();
        let cancel = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(SessionStatus::connecting());

        let task = SessionTask {
            id,
            query: query.clone(),
            transport: Arc::clone(&self.transport),
            supervisor: Arc::clone(&self.supervisor),
            observer: self.observer.clone(),
            idle_timeout: self.idle_timeout,
            cancel: cancel.clone(),
        };

        self.supervisor
            .install(id, cancel, status_tx, |previous| tokio::spawn(task.run(previous)));
        debug!(session_id = %id, query = query.as_str(), "session started");

        SessionHandle {
            id,
            query,
            status: status_rx,
        }
    }

    /// Close the live connection without waiting for a terminal message.
    pub fn stop(&self) {
        self.supervisor.stop();
    }

    /// State of the current (or most recent) session; `Idle` before any.
    pub fn state(&self) -> SessionState {
        self.supervisor
            .current_status()
            .map(|status| status.state)
            .unwrap_or(SessionState::Idle)
    }

    /// Snapshot of the current (or most recent) session.
    pub fn snapshot(&self) -> Option<ResponseSnapshot> {
        self.supervisor
            .current_status()
            .map(|status| status.snapshot)
    }

    pub async fn probe(&self) -> Reachability {
        self.supervisor.probe().await
    }

    pub fn supervisor(&self) -> &ConnectivitySupervisor {
        &self.supervisor
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.supervisor.stop();
    }
}

/// Caller-side view of one session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    query: String,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn state(&self) -> SessionState {
        self.status.borrow().state
    }

    pub fn snapshot(&self) -> ResponseSnapshot {
        self.status.borrow().snapshot.clone()
    }

    /// Wait until the session succeeds, fails, is superseded or stopped.
    pub async fn wait(mut self) -> SessionStatus {
        loop {
            {
                let current = self.status.borrow_and_update();
                if current.state.is_final() {
                    return current.clone();
                }
            }
            if self.status.changed().await.is_err() {
                return self.status.borrow().clone();
            }
        }
    }
}

enum Next {
    Event(TransportEvent),
    Failed(SiftError),
    Ended,
    Idle(Duration),
}

struct SessionTask {
    id: SessionId,
    query: String,
    transport: Arc<dyn StreamTransport>,
    supervisor: Arc<ConnectivitySupervisor>,
    observer: Option<SessionObserver>,
    idle_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl SessionTask {
    async fn run(self, previous: Option<JoinHandle<()>>) {
        // The superseded task was aborted; wait until its connection is gone.
        if let Some(previous) = previous {
            let _ = previous.await;
        }

        let mut emitter = NotificationEmitter::new(self.id);
        let mut accumulator = ResponseAccumulator::new();

        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return,
            opened = self.transport.open(&self.query) => opened,
        };
        let mut frames = match opened {
            Ok(frames) => frames,
            Err(err) => {
                self.fail_connection(&mut accumulator, &mut emitter, err.to_string());
                return;
            }
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(session_id = %self.id, "session cancelled");
                    return;
                }
                next = next_event(&mut frames, self.idle_timeout) => next,
            };

            match next {
                Next::Event(TransportEvent::Opened) => {
                    debug!(session_id = %self.id, "stream open");
                    self.supervisor.deliver(self.id, |status| {
                        status.send_modify(|status| status.state = SessionState::Streaming);
                    });
                }
                Next::Event(TransportEvent::Frame(payload)) => match decode(&payload) {
                    Ok(message) => {
                        let snapshot = accumulator.apply(message).clone();
                        let terminal = snapshot.is_terminal();
                        if !self.publish(&mut emitter, snapshot, None) {
                            return;
                        }
                        if terminal {
                            info!(
                                session_id = %self.id,
                                state = %self.current_state(&accumulator),
                                "session finished"
                            );
                            return;
                        }
                    }
                    Err(err) => {
                        warn!(session_id = %self.id, error = %err, "skipping undecodable frame");
                        let notice = Notice::Decode {
                            message: err.to_string(),
                        };
                        let snapshot = accumulator.snapshot().clone();
                        if !self.publish(&mut emitter, snapshot, Some(notice)) {
                            return;
                        }
                    }
                },
                Next::Failed(err) => {
                    self.fail_connection(&mut accumulator, &mut emitter, err.to_string());
                    return;
                }
                Next::Ended => {
                    self.fail_connection(
                        &mut accumulator,
                        &mut emitter,
                        "stream closed before completion".to_string(),
                    );
                    return;
                }
                Next::Idle(limit) => {
                    warn!(session_id = %self.id, seconds = limit.as_secs(), "session idle");
                    let message = format!(
                        "No data received from the server for {}s",
                        limit.as_secs()
                    );
                    let snapshot = accumulator.apply(StreamMessage::failure(message)).clone();
                    let notice = Notice::IdleTimeout {
                        seconds: limit.as_secs(),
                    };
                    self.publish(&mut emitter, snapshot, Some(notice));
                    return;
                }
            }
        }
    }

    /// Fail the session with the fixed connection error text.
    fn fail_connection(
        &self,
        accumulator: &mut ResponseAccumulator,
        emitter: &mut NotificationEmitter,
        detail: String,
    ) {
        warn!(session_id = %self.id, error = detail.as_str(), "connection failed");
        let message = connection_error_message(self.transport.endpoint());
        let snapshot = accumulator.apply(StreamMessage::failure(message)).clone();
        self.publish(emitter, snapshot, Some(Notice::Connection { message: detail }));
    }

    /// Update the handle and notify the observer, if still the live session.
    fn publish(
        &self,
        emitter: &mut NotificationEmitter,
        snapshot: ResponseSnapshot,
        notice: Option<Notice>,
    ) -> bool {
        let state = SessionState::from_terminal(snapshot.terminal).unwrap_or(SessionState::Streaming);
        let delivered = self.supervisor.deliver(self.id, |status| {
            status.send_replace(SessionStatus {
                state,
                snapshot: snapshot.clone(),
            });
            if let Some(observer) = &self.observer {
                observer(emitter.next(state, snapshot, notice));
            }
        });
        if !delivered {
            debug!(session_id = %self.id, "dropping update from retired session");
        }
        delivered
    }

    fn current_state(&self, accumulator: &ResponseAccumulator) -> SessionState {
        SessionState::from_terminal(accumulator.snapshot().terminal)
            .unwrap_or(SessionState::Streaming)
    }
}

async fn next_event(frames: &mut FrameStream, idle_timeout: Option<Duration>) -> Next {
    let next = match idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, frames.next()).await {
            Ok(next) => next,
            Err(_) => return Next::Idle(limit),
        },
        None => frames.next().await,
    };
    match next {
        Some(Ok(event)) => Next::Event(event),
        Some(Err(err)) => Next::Failed(err),
        None => Next::Ended,
    }
}

/// User-facing text for a session that lost its connection.
pub fn connection_error_message(endpoint: &str) -> String {
    format!("Connection error with the server. Please check if the backend is running at {endpoint}")
}
