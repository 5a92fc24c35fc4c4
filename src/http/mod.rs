//! Shared HTTP client and status handling.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};

use crate::error::SiftError;

/// Build a client for short request/response calls (probe, storage).
///
/// Streaming connections use their own client without a total timeout.
pub fn request_client(timeout: Duration) -> Result<reqwest::Client, SiftError> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(4)
        .build()?)
}

/// Build a client for long-lived event streams.
pub fn stream_client() -> Result<reqwest::Client, SiftError> {
    Ok(reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?)
}

/// Headers for JSON request bodies.
pub fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// Map a failed request or body read, keeping timeouts distinct.
pub fn send_error(err: reqwest::Error, timeout: Duration) -> SiftError {
    if err.is_timeout() {
        SiftError::Timeout(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
    } else {
        SiftError::Network(err)
    }
}

/// Map a non-success status and body to an error.
///
/// Backend errors come as `{"error": "..."}`; the raw body is used otherwise.
pub fn status_to_error(status: u16, body: &str) -> SiftError {
    SiftError::api(status, extract_error_message(body).unwrap_or_else(|| body.to_string()))
}

fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(|e| e.as_str())
                .map(str::to_string)
        })
}
