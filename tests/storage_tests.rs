//! Storage client tests against a mock backend.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use sift::error::SiftError;
use sift::storage::{HttpResponseStore, ResponseStore, SavedResponseDraft, UserIdentity};
use sift::types::{ResponseSnapshot, TerminalState};
use sift::util::retry::RetryPolicy;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

fn store_for(server: &MockServer) -> HttpResponseStore {
    HttpResponseStore::new(server.uri(), reqwest::Client::new()).with_retry_policy(fast_retry())
}

fn answer(text: &str) -> ResponseSnapshot {
    ResponseSnapshot {
        text: text.to_string(),
        terminal: TerminalState::Succeeded,
        ..Default::default()
    }
}

#[tokio::test]
async fn save_posts_draft_and_returns_document_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/pushData"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "content": "Three pubs worth visiting.",
            "userId": "user_42",
            "searchQuery": "best pubs",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Data stored successfully",
            "documentId": "66f0c0ffee",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let draft =
        SavedResponseDraft::from_snapshot("user_42", "best pubs", &answer("Three pubs worth visiting."))
            .unwrap();
    let id = store_for(&server).save(&draft).await.unwrap();
    assert_eq!(id, "66f0c0ffee");
}

#[tokio::test]
async fn save_is_not_retried_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/pushData"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "Failed to store data"})))
        .expect(1)
        .mount(&server)
        .await;

    let draft = SavedResponseDraft::from_snapshot("user_42", "q", &answer("text")).unwrap();
    let err = store_for(&server).save(&draft).await.unwrap_err();
    assert!(matches!(
        &err,
        SiftError::Api { status: 500, message } if message == "Failed to store data"
    ));
}

#[tokio::test]
async fn list_returns_stored_responses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/get-stored-responses"))
        .and(body_json(json!({"userId": "user_42"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responses": [
                {
                    "_id": "a1",
                    "content": "first",
                    "searchQuery": "one",
                    "timestamp": "2024-03-01T10:00:00.000Z",
                    "userId": "user_42",
                    "username": "ada",
                    "email": "ada@example.com"
                },
                { "_id": "b2", "content": "second" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let responses = store_for(&server).list("user_42").await.unwrap();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].id, "a1");
    assert_eq!(responses[0].search_query.as_deref(), Some("one"));
    assert_eq!(responses[0].username.as_deref(), Some("ada"));
    assert_eq!(responses[1].content, "second");
    assert_eq!(responses[1].timestamp, None);
}

#[tokio::test]
async fn list_maps_missing_user_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/get-stored-responses"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "User not found"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = store_for(&server).list("nobody").await.unwrap_err();
    assert_eq!(err.category(), sift::error::ErrorCategory::NotFound);
    assert_eq!(err.to_string(), "API error (status 404): User not found");
}

#[tokio::test]
async fn list_retries_transient_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/get-stored-responses"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/get-stored-responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"responses": []})))
        .expect(1)
        .mount(&server)
        .await;

    let responses = store_for(&server).list("user_42").await.unwrap();
    assert!(responses.is_empty());
}

#[tokio::test]
async fn delete_sends_response_id() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/delete-response"))
        .and(body_json(json!({"responseId": "a1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Response deleted successfully"})))
        .expect(1)
        .mount(&server)
        .await;

    store_for(&server).delete("a1").await.unwrap();
}

#[tokio::test]
async fn delete_rejects_empty_id_without_calling_backend() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = store_for(&server).delete("  ").await.unwrap_err();
    assert!(matches!(err, SiftError::InvalidArgument(_)));
}

#[tokio::test]
async fn sync_user_posts_identity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sync-user"))
        .and(body_json(json!({
            "clerkId": "user_42",
            "email": "ada@example.com",
            "name": "Ada",
            "imageUrl": null,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "User synced"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut user = UserIdentity::new("user_42");
    user.email = Some("ada@example.com".to_string());
    user.name = Some("Ada".to_string());
    store_for(&server).sync_user(&user).await.unwrap();
}

#[tokio::test]
async fn slow_backend_is_reported_as_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/get-stored-responses"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"responses": []}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let store = HttpResponseStore::new(server.uri(), reqwest::Client::new())
        .with_retry_policy(RetryPolicy::none())
        .with_request_timeout(Duration::from_millis(50));
    let err = store.list("user_42").await.unwrap_err();

    assert!(matches!(err, SiftError::Timeout(50)));
    assert!(err.is_retryable());
    assert_eq!(err.recovery_suggestion(), sift::error::RecoverySuggestion::IncreaseTimeout);
}

#[tokio::test]
async fn error_body_is_kept_in_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/delete-response"))
        .respond_with(ResponseTemplate::new(400).set_body_string("responseId is required"))
        .expect(1)
        .mount(&server)
        .await;

    let err = store_for(&server).delete("a1").await.unwrap_err();
    assert_eq!(err.to_string(), "API error (status 400): responseId is required");
}
