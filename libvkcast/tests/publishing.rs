//! Integration tests for the VK client's raise-to-result boundary
//!
//! These run against an unreachable local endpoint: the point is that
//! remote failures of any kind come back as failure results the web layer
//! can branch on, never as raised errors.

use libvkcast::types::PublishRequest;
use libvkcast::vk::VkClient;

/// Endpoint nothing listens on; connections are refused immediately.
const DEAD_ENDPOINT: &str = "http://127.0.0.1:9/method";

fn client() -> VkClient {
    VkClient::with_base_url("test-token", Some("100".to_string()), DEAD_ENDPOINT).unwrap()
}

#[tokio::test]
async fn check_token_folds_transport_failure_into_result() {
    let outcome = client().check_token().await;

    assert!(!outcome.success);
    assert!(outcome.payload.is_none());
    let message = outcome.error_message.unwrap();
    assert!(message.contains("Network error"), "got: {}", message);
}

#[tokio::test]
async fn publish_folds_transport_failure_into_result() {
    let outcome = client().publish(&PublishRequest::new("hello")).await;

    assert!(!outcome.success);
    assert!(outcome.error_message.is_some());
}

#[tokio::test]
async fn publish_wraps_upload_failure_without_raising() {
    let request = PublishRequest::new("with photo").with_media("/nonexistent/photo.png");
    let outcome = client().publish(&request).await;

    assert!(!outcome.success);
    let message = outcome.error_message.unwrap();
    assert!(message.contains("Photo upload failed"), "got: {}", message);
    assert!(message.contains("/nonexistent/photo.png"), "got: {}", message);
}

#[tokio::test]
async fn post_stats_without_post_id_fails_cleanly() {
    let outcome = client().post_stats("", None).await;

    assert!(!outcome.success);
    assert_eq!(outcome.error_message.as_deref(), Some("No post id given"));
}

#[tokio::test]
async fn user_groups_raises_instead_of_returning_a_result() {
    // The asymmetric operations propagate their errors to the caller.
    let result = client().user_groups().await;
    assert!(result.is_err());
}
