//! Integration tests for the download API.
//!
//! These tests require a running backend HTTP server with a seeded
//! database. Set the TEST_BASE_URL environment variable to specify the
//! server URL and TEST_DOWNLOAD_CODE for a fresh, unused code whose order
//! contains at least one item.
//!
//! Example:
//! ```sh
//! export TEST_BASE_URL="http://127.0.0.1:8080"
//! export TEST_DOWNLOAD_CODE="ABC123"
//! cargo test --test api_integration_tests -- --ignored
//! ```
//!
//! Note: These tests are marked with #[ignore] because they require
//! a running HTTP server. In CI, run them separately with a service container.

mod common;

use std::env;

use reqwest::{Client, StatusCode};
use serde_json::Value;

struct TestServer {
    base_url: String,
}

impl TestServer {
    fn new() -> Self {
        let base_url =
            env::var("TEST_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".into());
        Self { base_url }
    }

    fn download_code() -> String {
        env::var("TEST_DOWNLOAD_CODE").unwrap_or_else(|_| "ABC123".into())
    }
}

#[tokio::test]
#[ignore]
async fn health_endpoint_reports_database_status() {
    let server = TestServer::new();
    let client = Client::new();

    let resp = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .expect("health request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("invalid health body");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["database"]["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn verify_without_code_is_a_bad_request() {
    let server = TestServer::new();
    let client = Client::new();

    let resp = client
        .get(format!("{}/download/verify", server.base_url))
        .send()
        .await
        .expect("verify request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await.expect("invalid error body");
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
#[ignore]
async fn verify_unknown_code_returns_invalid_code() {
    let server = TestServer::new();
    let client = Client::new();

    let resp = client
        .get(format!(
            "{}/download/verify?code=DOES-NOT-EXIST",
            server.base_url
        ))
        .send()
        .await
        .expect("verify request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = resp.json().await.expect("invalid error body");
    assert_eq!(body["code"], "INVALID_CODE");
}

#[tokio::test]
#[ignore]
async fn verify_then_download_full_flow() {
    let server = TestServer::new();
    let client = Client::new();
    let code = TestServer::download_code();

    let resp = client
        .get(format!("{}/download/verify?code={code}", server.base_url))
        .send()
        .await
        .expect("verify request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("invalid verify body");
    assert_eq!(body["success"], true);
    let items = body["download"]["items"]
        .as_array()
        .expect("items missing from verify payload");
    assert!(!items.is_empty());

    let image_id = items[0]["imageId"].as_str().expect("item without imageId");
    let resp = client
        .get(format!(
            "{}/download/image?code={code}&imageId={image_id}",
            server.base_url
        ))
        .send()
        .await
        .expect("download request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("invalid download body");
    let url = body["url"].as_str().expect("no signed url in response");
    assert!(url.starts_with("http"));
}

#[tokio::test]
#[ignore]
async fn download_of_unpurchased_image_is_refused() {
    let server = TestServer::new();
    let client = Client::new();
    let code = TestServer::download_code();

    let resp = client
        .get(format!(
            "{}/download/image?code={code}&imageId=not-in-this-order",
            server.base_url
        ))
        .send()
        .await
        .expect("download request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = resp.json().await.expect("invalid error body");
    assert_eq!(body["code"], "ITEM_NOT_IN_ORDER");
}

#[tokio::test]
#[ignore]
async fn mark_used_then_download_is_forbidden() {
    let server = TestServer::new();
    let client = Client::new();
    let code = TestServer::download_code();

    let resp = client
        .post(format!(
            "{}/download/mark-used?code={code}",
            server.base_url
        ))
        .send()
        .await
        .expect("mark-used request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("invalid mark-used body");
    assert_eq!(body["success"], true);

    let resp = client
        .get(format!(
            "{}/download/image?code={code}&imageId=anything",
            server.base_url
        ))
        .send()
        .await
        .expect("download request failed");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body: Value = resp.json().await.expect("invalid error body");
    assert_eq!(body["code"], "CODE_ALREADY_USED");
}
