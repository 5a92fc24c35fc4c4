//! Clients for the response-storage and identity collaborators.
//!
//! Sift does not store anything itself. Finished answers are handed to a
//! backend store, keyed by an opaque user id the caller supplies.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::{join_url, SiftConfig, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::error::SiftError;
use crate::http::{json_headers, request_client, send_error, status_to_error};
use crate::types::ResponseSnapshot;
use crate::util::retry::RetryPolicy;

/// User identity supplied by the sign-in provider, passed through as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            name: None,
            image_url: None,
        }
    }
}

/// A finished answer ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedResponseDraft {
    pub content: String,
    pub user_id: String,
    pub search_query: String,
    pub timestamp: DateTime<Utc>,
}

impl SavedResponseDraft {
    /// Build a draft from a session's final snapshot.
    ///
    /// Only a successful, non-empty answer can be saved.
    pub fn from_snapshot(
        user_id: &str,
        query: &str,
        snapshot: &ResponseSnapshot,
    ) -> Result<Self, SiftError> {
        if user_id.trim().is_empty() {
            return Err(SiftError::InvalidArgument(
                "a user id is required to store responses".to_string(),
            ));
        }
        if !snapshot.succeeded() {
            return Err(SiftError::InvalidState(format!(
                "response has not completed successfully (terminal: {})",
                snapshot.terminal
            )));
        }
        if snapshot.text.is_empty() {
            return Err(SiftError::InvalidState("no response to store".to_string()));
        }
        Ok(Self {
            content: snapshot.text.clone(),
            user_id: user_id.to_string(),
            search_query: query.to_string(),
            timestamp: Utc::now(),
        })
    }
}

/// A stored answer as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub search_query: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Storage collaborator contract.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Store a finished answer, returning the new document id.
    async fn save(&self, draft: &SavedResponseDraft) -> Result<String, SiftError>;

    async fn list(&self, user_id: &str) -> Result<Vec<SavedResponse>, SiftError>;

    async fn delete(&self, response_id: &str) -> Result<(), SiftError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveAck {
    document_id: String,
}

#[derive(Debug, Deserialize)]
struct ListBody {
    #[serde(default)]
    responses: Vec<SavedResponse>,
}

/// JSON-over-HTTP client for the backend store.
#[derive(Debug, Clone)]
pub struct HttpResponseStore {
    base_url: String,
    client: reqwest::Client,
    retry_policy: RetryPolicy,
    request_timeout: Duration,
}

impl HttpResponseStore {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            retry_policy: RetryPolicy::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn from_config(config: &SiftConfig) -> Result<Self, SiftError> {
        Ok(Self::new(
            config.base_url(),
            request_client(config.request_timeout())?,
        )
        .with_request_timeout(config.request_timeout()))
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Per-request timeout, reported as [`SiftError::Timeout`] when exceeded.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Register or refresh the signed-in user on the backend.
    pub async fn sync_user(&self, user: &UserIdentity) -> Result<(), SiftError> {
        let body = json!({
            "clerkId": user.id,
            "email": user.email,
            "name": user.name,
            "imageUrl": user.image_url,
        });
        self.retry_policy
            .execute(|| async {
                self.send(reqwest::Method::POST, "/api/sync-user", &body)
                    .await
                    .map(|_| ())
            })
            .await
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<String, SiftError> {
        let url = join_url(&self.base_url, path);
        debug!(method = %method, url = url.as_str(), "storage request");

        let resp = self
            .client
            .request(method, &url)
            .headers(json_headers())
            .timeout(self.request_timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| send_error(e, self.request_timeout))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| send_error(e, self.request_timeout))?;
        if !status.is_success() {
            return Err(status_to_error(status.as_u16(), &text));
        }
        Ok(text)
    }
}

#[async_trait]
impl ResponseStore for HttpResponseStore {
    async fn save(&self, draft: &SavedResponseDraft) -> Result<String, SiftError> {
        // Not retried: a lost acknowledgement would store the answer twice.
        let body = serde_json::to_value(draft)?;
        let text = self
            .send(reqwest::Method::POST, "/api/pushData", &body)
            .await?;
        let ack: SaveAck = serde_json::from_str(&text)?;
        Ok(ack.document_id)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<SavedResponse>, SiftError> {
        let body = json!({ "userId": user_id });
        let text = self
            .retry_policy
            .execute(|| self.send(reqwest::Method::POST, "/api/get-stored-responses", &body))
            .await?;
        let list: ListBody = serde_json::from_str(&text)?;
        Ok(list.responses)
    }

    async fn delete(&self, response_id: &str) -> Result<(), SiftError> {
        if response_id.trim().is_empty() {
            return Err(SiftError::InvalidArgument(
                "response id must not be empty".to_string(),
            ));
        }
        let body = json!({ "responseId": response_id });
        self.retry_policy
            .execute(|| self.send(reqwest::Method::DELETE, "/api/delete-response", &body))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TerminalState;

    fn finished(text: &str, terminal: TerminalState) -> ResponseSnapshot {
        ResponseSnapshot {
            text: text.to_string(),
            terminal,
            ..Default::default()
        }
    }

    #[test]
    fn draft_requires_success() {
        let err = SavedResponseDraft::from_snapshot(
            "user_1",
            "q",
            &finished("partial", TerminalState::Failed),
        )
        .unwrap_err();
        assert!(matches!(err, SiftError::InvalidState(_)));

        let err = SavedResponseDraft::from_snapshot(
            "user_1",
            "q",
            &finished("streaming", TerminalState::None),
        )
        .unwrap_err();
        assert!(matches!(err, SiftError::InvalidState(_)));
    }

    #[test]
    fn draft_requires_text_and_user() {
        assert!(matches!(
            SavedResponseDraft::from_snapshot("user_1", "q", &finished("", TerminalState::Succeeded)),
            Err(SiftError::InvalidState(_))
        ));
        assert!(matches!(
            SavedResponseDraft::from_snapshot(" ", "q", &finished("answer", TerminalState::Succeeded)),
            Err(SiftError::InvalidArgument(_))
        ));
    }

    #[test]
    fn draft_serializes_with_backend_field_names() {
        let draft = SavedResponseDraft::from_snapshot(
            "user_1",
            "rust meetups",
            &finished("# Answer", TerminalState::Succeeded),
        )
        .unwrap();
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["content"], "# Answer");
        assert_eq!(json["userId"], "user_1");
        assert_eq!(json["searchQuery"], "rust meetups");
        assert!(json["timestamp"].as_str().is_some());
    }

    #[test]
    fn saved_response_accepts_sparse_documents() {
        let saved: SavedResponse =
            serde_json::from_str(r#"{"_id":"abc","content":"text"}"#).unwrap();
        assert_eq!(saved.id, "abc");
        assert_eq!(saved.search_query, None);
    }
}
