//! Shared test helpers and scripted transport.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use sift::error::SiftError;
use sift::session::{ConnectivitySupervisor, SessionNotification};
use sift::transport::{FrameStream, StreamTransport, TransportEvent};

/// One step of a scripted connection.
#[derive(Debug, Clone)]
pub enum Step {
    Open,
    Frame(String),
    Sleep(Duration),
    Fail(String),
    /// Run a callback from inside the stream, before the next step.
    Run(Hook),
    /// Keep the connection open forever.
    Hang,
}

/// Callback run by [`Step::Run`].
#[derive(Clone)]
pub struct Hook(pub Arc<dyn Fn() + Send + Sync>);

impl std::fmt::Debug for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Hook")
    }
}

pub fn run(callback: impl Fn() + Send + Sync + 'static) -> Step {
    Step::Run(Hook(Arc::new(callback)))
}

pub fn frame(payload: &str) -> Step {
    Step::Frame(payload.to_string())
}

/// Transport that replays a script per query and counts live connections.
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, Vec<Step>>>,
    live: Arc<AtomicUsize>,
    opened: AtomicUsize,
    open_error: Mutex<Option<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            live: Arc::new(AtomicUsize::new(0)),
            opened: AtomicUsize::new(0),
            open_error: Mutex::new(None),
        }
    }

    pub fn script(&self, query: &str, steps: Vec<Step>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(query.to_string(), steps);
    }

    pub fn fail_open(&self, message: &str) {
        *self.open_error.lock().unwrap() = Some(message.to_string());
    }

    /// Connections currently open.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Connections ever opened.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StreamTransport for ScriptedTransport {
    fn endpoint(&self) -> &str {
        "http://scripted.test/api/stream"
    }

    async fn open(&self, query: &str) -> Result<FrameStream, SiftError> {
        if let Some(message) = self.open_error.lock().unwrap().clone() {
            return Err(SiftError::Connection(message));
        }
        let steps = self
            .scripts
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default();

        self.opened.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        let guard = LiveGuard(Arc::clone(&self.live));

        let stream = async_stream::stream! {
            let _guard = guard;
            for step in steps {
                match step {
                    Step::Open => yield Ok(TransportEvent::Opened),
                    Step::Frame(payload) => yield Ok(TransportEvent::Frame(payload)),
                    Step::Sleep(duration) => tokio::time::sleep(duration).await,
                    Step::Fail(message) => {
                        yield Err(SiftError::Connection(message));
                        break;
                    }
                    Step::Run(hook) => (hook.0)(),
                    Step::Hang => futures::future::pending::<()>().await,
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

/// Supervisor whose probe target is never contacted in these tests.
pub fn offline_supervisor() -> ConnectivitySupervisor {
    ConnectivitySupervisor::new("http://127.0.0.1:9/api/stream", Duration::from_millis(200))
        .expect("supervisor")
}

/// Pull the next notification, failing the test after a generous wait.
pub async fn next_notification<S>(stream: &mut S) -> SessionNotification
where
    S: futures::Stream<Item = SessionNotification> + Unpin,
{
    tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("timed out waiting for a notification")
        .expect("notification stream closed")
}

/// Collect notifications until one carries a final state.
pub async fn until_final<S>(stream: &mut S) -> Vec<SessionNotification>
where
    S: futures::Stream<Item = SessionNotification> + Unpin,
{
    let mut seen = Vec::new();
    loop {
        let notification = next_notification(stream).await;
        let done = notification.state.is_final();
        seen.push(notification);
        if done {
            return seen;
        }
    }
}
