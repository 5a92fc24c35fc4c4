//! Configuration system (layered: defaults < config file < env).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SiftError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_STREAM_PATH: &str = "/api/stream";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client configuration for the answer stream and its collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiftConfig {
    /// Backend origin, without a trailing slash.
    pub base_url: String,
    /// Path of the streaming endpoint; also used by the health probe.
    pub stream_path: String,
    /// Timeout for probe and storage requests.
    pub request_timeout_secs: u64,
    /// Fail a session after this many seconds without a frame.
    pub idle_timeout_secs: Option<u64>,
    /// Identity passed through to the storage collaborator.
    pub user_id: Option<String>,
}

impl Default for SiftConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            idle_timeout_secs: None,
            user_id: None,
        }
    }
}

impl SiftConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load defaults, then `~/.sift/config.toml` if present, then env vars.
    pub fn load() -> Result<Self, SiftError> {
        let path = default_config_path();
        let config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.with_env_overrides()
    }

    /// Load from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, SiftError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw).map_err(|e| {
            SiftError::Configuration(format!("invalid config file {}: {e}", path.display()))
        })?;
        config.validated()
    }

    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Result<Self, SiftError> {
        Self::default().with_env_overrides()
    }

    /// Apply `SIFT_*` environment variables (and a `.env` file, if present).
    pub fn with_env_overrides(mut self) -> Result<Self, SiftError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error

        if let Ok(url) = std::env::var("SIFT_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(path) = std::env::var("SIFT_STREAM_PATH") {
            self.stream_path = path;
        }
        if let Ok(raw) = std::env::var("SIFT_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_secs("SIFT_REQUEST_TIMEOUT_SECS", &raw)?;
        }
        if let Ok(raw) = std::env::var("SIFT_IDLE_TIMEOUT_SECS") {
            self.idle_timeout_secs = Some(parse_secs("SIFT_IDLE_TIMEOUT_SECS", &raw)?);
        }
        if let Ok(user) = std::env::var("SIFT_USER_ID") {
            self.user_id = Some(user);
        }

        self.validated()
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_stream_path(mut self, path: impl Into<String>) -> Self {
        self.stream_path = path.into();
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn with_idle_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.idle_timeout_secs = secs;
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Backend origin with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Full URL of the streaming endpoint.
    pub fn stream_url(&self) -> String {
        join_url(self.base_url(), &self.stream_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }

    fn validated(self) -> Result<Self, SiftError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(SiftError::Configuration(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(SiftError::Configuration(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.idle_timeout_secs == Some(0) {
            return Err(SiftError::Configuration(
                "idle_timeout_secs must be greater than zero when set".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Join an origin and a path with exactly one slash between them.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn parse_secs(var: &str, raw: &str) -> Result<u64, SiftError> {
    raw.trim()
        .parse()
        .map_err(|_| SiftError::Configuration(format!("{var} must be a whole number of seconds")))
}

/// `~/.sift/config.toml`, or `.sift/config.toml` when no home directory exists.
pub fn default_config_path() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".sift"))
        .unwrap_or_else(|| PathBuf::from(".sift"))
        .join("config.toml")
}
