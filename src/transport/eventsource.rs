//! Server-sent events transport.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest_eventsource::{retry::Never, Error as EventSourceError, Event, EventSource};
use tracing::debug;

use super::{FrameStream, StreamTransport, TransportEvent};
use crate::config::SiftConfig;
use crate::error::SiftError;
use crate::http::stream_client;

/// Opens `GET {stream_url}?query=...` as an event stream.
///
/// Reconnection is disabled: a dropped connection surfaces as one error and
/// the caller decides whether to start again.
#[derive(Debug, Clone)]
pub struct EventSourceTransport {
    stream_url: String,
    client: reqwest::Client,
}

impl EventSourceTransport {
    pub fn new(stream_url: impl Into<String>) -> Result<Self, SiftError> {
        Ok(Self {
            stream_url: stream_url.into(),
            client: stream_client()?,
        })
    }

    pub fn from_config(config: &SiftConfig) -> Result<Self, SiftError> {
        Self::new(config.stream_url())
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl StreamTransport for EventSourceTransport {
    fn endpoint(&self) -> &str {
        &self.stream_url
    }

    async fn open(&self, query: &str) -> Result<FrameStream, SiftError> {
        let request = self
            .client
            .get(&self.stream_url)
            .query(&[("query", query)])
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"));

        let mut source = EventSource::new(request)
            .map_err(|e| SiftError::Connection(format!("cannot build stream request: {e}")))?;
        source.set_retry_policy(Box::new(Never));

        debug!(url = self.stream_url.as_str(), "opening event stream");

        let stream = async_stream::stream! {
            while let Some(event) = source.next().await {
                match event {
                    Ok(Event::Open) => yield Ok(TransportEvent::Opened),
                    Ok(Event::Message(message)) => yield Ok(TransportEvent::Frame(message.data)),
                    Err(EventSourceError::StreamEnded) => break,
                    Err(err) => {
                        yield Err(SiftError::Connection(describe(&err)));
                        break;
                    }
                }
            }
            source.close();
        };

        Ok(Box::pin(stream))
    }
}

fn describe(err: &EventSourceError) -> String {
    match err {
        EventSourceError::InvalidStatusCode(status, _) => {
            format!("server answered with status {status}")
        }
        EventSourceError::InvalidContentType(content_type, _) => format!(
            "server answered with content type {}",
            content_type.to_str().unwrap_or("<binary>")
        ),
        other => other.to_string(),
    }
}
