//! Single-flight session slot and backend reachability probe.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SiftConfig;
use crate::error::SiftError;
use crate::http::request_client;
use crate::types::{SessionId, SessionState, SessionStatus};

/// Result of a preflight probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    Unreachable { reason: String },
}

impl Reachability {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable)
    }
}

/// The session currently owning the slot.
pub(crate) struct ActiveSession {
    id: SessionId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    status: watch::Sender<SessionStatus>,
}

impl ActiveSession {
    fn accepts_updates(&self) -> bool {
        !self.cancel.is_cancelled() && !self.status.borrow().state.is_final()
    }

    /// Cancel the task, close its connection and settle its state.
    fn retire(&self, state: SessionState) {
        self.cancel.cancel();
        self.task.abort();
        self.status.send_if_modified(|status| {
            if status.state.is_final() {
                return false;
            }
            status.state = state;
            true
        });
    }
}

/// Keeps at most one live session and probes the backend.
///
/// Every state change a session publishes goes through [`deliver`], which
/// checks slot ownership under the same lock [`install`] takes. Once a new
/// session is installed, nothing from the previous one reaches observers.
///
/// [`deliver`]: ConnectivitySupervisor::deliver
/// [`install`]: ConnectivitySupervisor::install
pub struct ConnectivitySupervisor {
    probe_url: String,
    client: reqwest::Client,
    slot: Mutex<Option<ActiveSession>>,
}

impl std::fmt::Debug for ConnectivitySupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivitySupervisor")
            .field("probe_url", &self.probe_url)
            .field("active", &self.current_id())
            .finish()
    }
}

impl ConnectivitySupervisor {
    pub fn new(probe_url: impl Into<String>, timeout: Duration) -> Result<Self, SiftError> {
        Ok(Self {
            probe_url: probe_url.into(),
            client: request_client(timeout)?,
            slot: Mutex::new(None),
        })
    }

    pub fn from_config(config: &SiftConfig) -> Result<Self, SiftError> {
        Self::new(config.stream_url(), config.request_timeout())
    }

    /// Check that the stream endpoint answers at all.
    ///
    /// Advisory only: failures are logged and returned, never raised.
    pub async fn probe(&self) -> Reachability {
        let result = self
            .client
            .get(&self.probe_url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await;

        let reachability = match result {
            Ok(response) if response.status().is_success() => Reachability::Reachable,
            Ok(response) => Reachability::Unreachable {
                reason: format!("server answered with status {}", response.status()),
            },
            Err(err) => Reachability::Unreachable {
                reason: err.to_string(),
            },
        };

        match &reachability {
            Reachability::Reachable => debug!(url = self.probe_url.as_str(), "backend reachable"),
            Reachability::Unreachable { reason } => warn!(
                url = self.probe_url.as_str(),
                reason = reason.as_str(),
                "backend may not be available"
            ),
        }
        reachability
    }

    /// Retire the current session, then launch and install a new one.
    ///
    /// `launch` receives the retired session's task so the new task can
    /// wait for the old connection to be released before opening its own.
    pub(crate) fn install<F>(
        &self,
        id: SessionId,
        cancel: CancellationToken,
        status: watch::Sender<SessionStatus>,
        launch: F,
    ) where
        F: FnOnce(Option<JoinHandle<()>>) -> JoinHandle<()>,
    {
        let mut slot = self.lock();
        let previous = slot.take().map(|active| {
            debug!(session_id = %active.id, superseded_by = %id, "superseding session");
            active.retire(SessionState::Superseded);
            active.task
        });
        let task = launch(previous);
        *slot = Some(ActiveSession {
            id,
            cancel,
            task,
            status,
        });
    }

    /// Run `publish` only if session `id` still owns the slot and is live.
    ///
    /// A stopped or settled session stays in the slot but accepts nothing,
    /// so a final state is never overwritten.
    pub(crate) fn deliver<F>(&self, id: SessionId, publish: F) -> bool
    where
        F: FnOnce(&watch::Sender<SessionStatus>),
    {
        let slot = self.lock();
        match slot.as_ref() {
            Some(active) if active.id == id && active.accepts_updates() => {
                publish(&active.status);
                true
            }
            _ => false,
        }
    }

    /// Close the live connection, if any. Idempotent.
    pub fn stop(&self) {
        if let Some(active) = self.lock().as_ref() {
            debug!(session_id = %active.id, "stopping session");
            active.retire(SessionState::Stopped);
        }
    }

    pub fn current_id(&self) -> Option<SessionId> {
        self.lock().as_ref().map(|active| active.id)
    }

    /// Status of the current (or most recent) session.
    pub fn current_status(&self) -> Option<SessionStatus> {
        self.lock()
            .as_ref()
            .map(|active| active.status.borrow().clone())
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
