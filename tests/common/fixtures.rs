//! Test fixtures: order builders and stub URL signers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use photo_vault_backend::error::{AppError, Result};
use photo_vault_backend::models::{Order, OrderItem};
use photo_vault_backend::services::download_service::UrlPolicy;
use photo_vault_backend::storage::{SignedUrl, UrlSigner};

pub fn order_item(image_id: &str) -> OrderItem {
    OrderItem {
        image_id: image_id.to_string(),
        actress_id: "a1".to_string(),
        actress_name: "Test Actress".to_string(),
        hq_url: Some(format!("/securepic/1/{image_id}.jpg")),
        image_url: Some(format!("/pic/1/{image_id}.jpg")),
        thumbnail_url: Some(format!("/thumb/1/{image_id}.jpg")),
        width: Some(4000),
        height: Some(6000),
        file_size_mb: Some(18.5),
    }
}

/// An item whose HQ asset reference is missing (upstream data problem).
pub fn item_without_hq(image_id: &str) -> OrderItem {
    OrderItem {
        hq_url: None,
        ..order_item(image_id)
    }
}

pub fn order_with_items(order_id: &str, code: &str, items: Vec<OrderItem>) -> Order {
    Order {
        order_id: order_id.to_string(),
        download_code: code.to_string(),
        email: "buyer@example.com".to_string(),
        total: 12.0 * items.len() as f64,
        created_at: Utc::now(),
        used: false,
        items,
        downloads: vec![],
    }
}

pub fn two_item_order(order_id: &str, code: &str) -> Order {
    order_with_items(order_id, code, vec![order_item("img1"), order_item("img2")])
}

pub fn test_policy() -> UrlPolicy {
    UrlPolicy {
        preview_bucket: "previews".to_string(),
        asset_bucket: "masters".to_string(),
        preview_ttl: Duration::from_secs(60),
        asset_ttl: Duration::from_secs(300),
    }
}

/// Signer that mints deterministic URLs and counts invocations.
#[derive(Default)]
pub struct StaticSigner {
    pub calls: AtomicUsize,
}

impl StaticSigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UrlSigner for StaticSigner {
    async fn sign(&self, path: &str, bucket: &str, ttl: Duration) -> Result<SignedUrl> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = path.trim_start_matches('/');
        Ok(SignedUrl {
            url: format!("https://signed.test/{bucket}/{key}?exp={}", ttl.as_secs()),
            expires_in: ttl,
        })
    }
}

/// Signer that always fails, simulating a storage backend outage.
pub struct FailingSigner;

#[async_trait]
impl UrlSigner for FailingSigner {
    async fn sign(&self, _path: &str, _bucket: &str, _ttl: Duration) -> Result<SignedUrl> {
        Err(AppError::SigningUnavailable(
            "storage backend unreachable".to_string(),
        ))
    }
}
