//! In-memory order ledger.
//!
//! Backs demo deployments and tests: a mutex-guarded map with an optional
//! JSON seed file, matching the order-store format produced by the
//! checkout flow. A single lock covers every read-modify-write, so the
//! exhaustion flip is trivially atomic.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{DownloadEntry, Order};
use crate::services::order_ledger::{normalize_code, OrderLedger};

#[derive(Default)]
pub struct MemoryOrderLedger {
    // Keyed by order_id; codes resolved by scan (order counts are small).
    orders: Mutex<HashMap<String, Order>>,
}

impl MemoryOrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an order. Codes are stored uppercase.
    pub async fn insert(&self, mut order: Order) {
        order.download_code = normalize_code(&order.download_code);
        self.orders
            .lock()
            .await
            .insert(order.order_id.clone(), order);
    }

    /// Load a JSON array of orders (the checkout seed format).
    /// Returns the number of orders loaded.
    pub async fn load_from_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        let seeded: Vec<Order> = serde_json::from_slice(&bytes)?;
        let count = seeded.len();
        for order in seeded {
            self.insert(order).await;
        }
        tracing::info!(count, path = %path.as_ref().display(), "Order seed loaded");
        Ok(count)
    }
}

#[async_trait]
impl OrderLedger for MemoryOrderLedger {
    async fn get_by_order_id(&self, order_id: &str) -> Result<Option<Order>> {
        Ok(self.orders.lock().await.get(order_id).cloned())
    }

    async fn get_by_code(&self, code: &str, _force_refresh: bool) -> Result<Option<Order>> {
        let code = normalize_code(code);
        Ok(self
            .orders
            .lock()
            .await
            .values()
            .find(|o| o.download_code == code)
            .cloned())
    }

    async fn record_download(&self, order_id: &str, image_id: &str) -> Result<bool> {
        let mut orders = self.orders.lock().await;
        let Some(order) = orders.get_mut(order_id) else {
            return Ok(false);
        };

        // Only purchased items may enter the log (the relational adapter
        // enforces this with a composite foreign key).
        if order.item(image_id).is_none() {
            return Ok(false);
        }

        if !order.downloads.iter().any(|d| d.image_id == image_id) {
            order.downloads.push(DownloadEntry {
                image_id: image_id.to_string(),
                downloaded_at: Utc::now(),
            });
        }

        if !order.used && order.is_fully_downloaded() {
            order.used = true;
            tracing::info!(
                order_id = %order_id,
                "All images downloaded, download code exhausted"
            );
            return Ok(true);
        }

        Ok(false)
    }

    async fn mark_used(&self, order_id: &str) -> Result<()> {
        let mut orders = self.orders.lock().await;
        if let Some(order) = orders.get_mut(order_id) {
            order.used = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderItem;
    use std::sync::Arc;

    fn two_item_order() -> Order {
        let item = |id: &str| OrderItem {
            image_id: id.to_string(),
            actress_id: "a1".to_string(),
            actress_name: "Test Actress".to_string(),
            hq_url: Some(format!("/securepic/1/{id}.jpg")),
            image_url: None,
            thumbnail_url: None,
            width: None,
            height: None,
            file_size_mb: None,
        };
        Order {
            order_id: "ord-1".to_string(),
            download_code: "code-xy".to_string(),
            email: "buyer@example.com".to_string(),
            total: 12.0,
            created_at: Utc::now(),
            used: false,
            items: vec![item("img1"), item("img2")],
            downloads: vec![],
        }
    }

    #[tokio::test]
    async fn lookup_by_code_is_case_insensitive() {
        let ledger = MemoryOrderLedger::new();
        ledger.insert(two_item_order()).await;
        assert!(ledger.get_by_code("CODE-XY", true).await.unwrap().is_some());
        assert!(ledger.get_by_code(" code-xy ", false).await.unwrap().is_some());
        assert!(ledger.get_by_code("other", true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn repeated_downloads_of_one_item_do_not_exhaust() {
        let ledger = MemoryOrderLedger::new();
        ledger.insert(two_item_order()).await;

        assert!(!ledger.record_download("ord-1", "img1").await.unwrap());
        assert!(!ledger.record_download("ord-1", "img1").await.unwrap());

        let order = ledger.get_by_order_id("ord-1").await.unwrap().unwrap();
        assert_eq!(order.downloads.len(), 1);
        assert!(!order.used);
    }

    #[tokio::test]
    async fn last_item_flips_used_exactly_once() {
        let ledger = MemoryOrderLedger::new();
        ledger.insert(two_item_order()).await;

        assert!(!ledger.record_download("ord-1", "img1").await.unwrap());
        assert!(ledger.record_download("ord-1", "img2").await.unwrap());
        // Already exhausted: no second flip
        assert!(!ledger.record_download("ord-1", "img2").await.unwrap());

        let order = ledger.get_by_order_id("ord-1").await.unwrap().unwrap();
        assert!(order.used);
    }

    #[tokio::test]
    async fn unknown_order_records_nothing() {
        let ledger = MemoryOrderLedger::new();
        assert!(!ledger.record_download("missing", "img1").await.unwrap());
    }

    #[tokio::test]
    async fn items_outside_the_order_are_never_logged() {
        let ledger = MemoryOrderLedger::new();
        ledger.insert(two_item_order()).await;

        assert!(!ledger.record_download("ord-1", "img99").await.unwrap());

        let order = ledger.get_by_order_id("ord-1").await.unwrap().unwrap();
        assert!(order.downloads.is_empty());
        assert!(!order.used);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_downloads_flip_exactly_once() {
        let ledger = Arc::new(MemoryOrderLedger::new());
        ledger.insert(two_item_order()).await;

        let mut handles = Vec::new();
        for image_id in ["img1", "img2", "img1", "img2"] {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.record_download("ord-1", image_id).await.unwrap()
            }));
        }

        let mut flips = 0;
        for handle in handles {
            if handle.await.unwrap() {
                flips += 1;
            }
        }

        assert_eq!(flips, 1);
        let order = ledger.get_by_order_id("ord-1").await.unwrap().unwrap();
        assert!(order.used);
        assert_eq!(order.distinct_downloaded(), 2);
        assert_eq!(order.downloads.len(), 2);
    }

    #[tokio::test]
    async fn seed_file_round_trip() {
        let ledger = MemoryOrderLedger::new();
        let orders = vec![two_item_order()];
        let path = std::env::temp_dir().join(format!(
            "photo-vault-seed-{}.json",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        tokio::fs::write(&path, serde_json::to_vec(&orders).unwrap())
            .await
            .unwrap();

        let loaded = ledger.load_from_file(&path).await.unwrap();
        assert_eq!(loaded, 1);
        assert!(ledger.get_by_code("code-xy", true).await.unwrap().is_some());

        let _ = tokio::fs::remove_file(&path).await;
    }
}
