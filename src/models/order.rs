//! Order model: a completed purchase of one or more high-resolution images,
//! identified by an internal id and a single-use download code.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A purchased image within an order. The item set is fixed at order
/// creation time; this subsystem never adds or removes items.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub image_id: String,
    pub actress_id: String,
    pub actress_name: String,
    /// Storage reference for the paid high-resolution asset. May be absent
    /// when upstream data is broken; downloads must then fail rather than
    /// degrade to a preview rendition.
    #[serde(default)]
    pub hq_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
    #[serde(default, rename = "fileSizeMB")]
    pub file_size_mb: Option<f64>,
}

/// One entry in the download log.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadEntry {
    pub image_id: String,
    pub downloaded_at: DateTime<Utc>,
}

/// Order aggregate as handed out by the ledger.
///
/// Created upstream by the checkout flow; mutated only through the ledger's
/// `record_download` / `mark_used` operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    pub download_code: String,
    pub email: String,
    #[serde(default)]
    pub total: f64,
    pub created_at: DateTime<Utc>,
    pub used: bool,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub downloads: Vec<DownloadEntry>,
}

impl Order {
    /// Find a purchased item by image id.
    pub fn item(&self, image_id: &str) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.image_id == image_id)
    }

    /// Number of distinct items that have been downloaded at least once.
    pub fn distinct_downloaded(&self) -> usize {
        self.downloads
            .iter()
            .map(|d| d.image_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// True when every item in the order appears in the download log.
    /// Empty orders never count as fully downloaded.
    pub fn is_fully_downloaded(&self) -> bool {
        if self.items.is_empty() || self.downloads.is_empty() {
            return false;
        }
        let downloaded: HashSet<&str> =
            self.downloads.iter().map(|d| d.image_id.as_str()).collect();
        self.items
            .iter()
            .all(|item| downloaded.contains(item.image_id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> OrderItem {
        OrderItem {
            image_id: id.to_string(),
            actress_id: "a1".to_string(),
            actress_name: "Test Actress".to_string(),
            hq_url: Some(format!("/securepic/1/{id}.jpg")),
            image_url: Some(format!("/newpic/1/{id}.jpg")),
            thumbnail_url: None,
            width: Some(2400),
            height: Some(3000),
            file_size_mb: Some(8.2),
        }
    }

    fn entry(id: &str) -> DownloadEntry {
        DownloadEntry {
            image_id: id.to_string(),
            downloaded_at: Utc::now(),
        }
    }

    fn order(items: &[&str], downloads: &[&str]) -> Order {
        Order {
            order_id: "ord-1".to_string(),
            download_code: "ABCD1234".to_string(),
            email: "buyer@example.com".to_string(),
            total: 19.90,
            created_at: Utc::now(),
            used: false,
            items: items.iter().map(|i| item(i)).collect(),
            downloads: downloads.iter().map(|d| entry(d)).collect(),
        }
    }

    #[test]
    fn empty_order_is_never_fully_downloaded() {
        assert!(!order(&[], &[]).is_fully_downloaded());
    }

    #[test]
    fn partial_downloads_do_not_complete_the_order() {
        let o = order(&["img1", "img2"], &["img1"]);
        assert_eq!(o.distinct_downloaded(), 1);
        assert!(!o.is_fully_downloaded());
    }

    #[test]
    fn duplicate_log_entries_count_once() {
        let o = order(&["img1", "img2"], &["img1", "img1"]);
        assert_eq!(o.distinct_downloaded(), 1);
        assert!(!o.is_fully_downloaded());
    }

    #[test]
    fn all_items_downloaded_completes_the_order() {
        let o = order(&["img1", "img2"], &["img2", "img1"]);
        assert!(o.is_fully_downloaded());
    }

    #[test]
    fn item_lookup_by_image_id() {
        let o = order(&["img1", "img2"], &[]);
        assert!(o.item("img2").is_some());
        assert!(o.item("img9").is_none());
    }

    #[test]
    fn order_round_trips_through_seed_json() {
        let o = order(&["img1"], &["img1"]);
        let json = serde_json::to_string(&o).unwrap();
        assert!(json.contains("downloadCode"));
        assert!(json.contains("fileSizeMB"));
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back.order_id, o.order_id);
        assert_eq!(back.items.len(), 1);
        assert_eq!(back.downloads.len(), 1);
    }
}
