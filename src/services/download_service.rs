//! Download service: code verification and the usage state machine.
//!
//! The single place that decides whether a code may still retrieve assets.
//! Verification is read-only and never rejects an exhausted code; the lock
//! is enforced strictly at the point of asset retrieval.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::OrderItem;
use crate::services::order_ledger::{normalize_code, OrderLedger};
use crate::storage::{SignedUrl, UrlSigner};

/// Buckets and TTLs applied when minting URLs.
#[derive(Debug, Clone)]
pub struct UrlPolicy {
    /// Bucket holding preview/thumbnail renditions
    pub preview_bucket: String,
    /// Bucket holding the paid high-resolution originals
    pub asset_bucket: String,
    /// TTL for preview URLs (short: they appear on the verify page)
    pub preview_ttl: Duration,
    /// TTL for HQ asset URLs
    pub asset_ttl: Duration,
}

impl UrlPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            preview_bucket: config.preview_bucket.clone(),
            asset_bucket: config.asset_bucket.clone(),
            preview_ttl: Duration::from_secs(config.preview_url_ttl_secs),
            asset_ttl: Duration::from_secs(config.asset_url_ttl_secs),
        }
    }
}

/// Read-only view of an order returned by `verify`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadView {
    pub order_id: String,
    pub email: String,
    pub items: Vec<DownloadItemView>,
    pub code: String,
    pub used: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadItemView {
    pub image_id: String,
    pub actress_id: String,
    pub actress_name: String,
    pub hq_url: Option<String>,
    pub image_url: Option<String>,
    /// Signed preview URL (never derived from the HQ asset)
    pub thumbnail_url: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    #[serde(rename = "fileSizeMB")]
    pub file_size_mb: Option<f64>,
}

/// Code verifier + download logger over the ledger and the URL signer.
pub struct DownloadService {
    ledger: Arc<dyn OrderLedger>,
    signer: Arc<dyn UrlSigner>,
    policy: UrlPolicy,
}

impl DownloadService {
    pub fn new(ledger: Arc<dyn OrderLedger>, signer: Arc<dyn UrlSigner>, policy: UrlPolicy) -> Self {
        Self {
            ledger,
            signer,
            policy,
        }
    }

    /// Verify a download code and return the order view with signed
    /// preview URLs. Read-only: exhausted codes still verify, with
    /// `used: true` in the view.
    pub async fn verify(&self, raw_code: &str) -> Result<DownloadView> {
        let code = self.require_code(raw_code)?;

        // Never trust a cache here: a stale `used = false` would let an
        // exhausted code appear valid.
        let order = self
            .ledger
            .get_by_code(&code, true)
            .await?
            .ok_or(AppError::InvalidCode)?;

        let mut items = Vec::with_capacity(order.items.len());
        for item in &order.items {
            items.push(self.preview_view(item).await?);
        }

        tracing::debug!(
            order_id = %order.order_id,
            items = items.len(),
            used = order.used,
            "Download code verified"
        );

        Ok(DownloadView {
            order_id: order.order_id,
            email: order.email,
            items,
            code: order.download_code,
            used: order.used,
        })
    }

    /// Retrieve one purchased asset: log the download (idempotently,
    /// flipping the order to used when it was the last outstanding item)
    /// and mint a signed URL for the HQ object.
    ///
    /// The log entry is written before minting; a signing failure after a
    /// successful log leaves that slot consumed.
    pub async fn download_item(
        &self,
        raw_code: &str,
        image_id: &str,
        hq_override: Option<&str>,
    ) -> Result<SignedUrl> {
        let code = self.require_code(raw_code)?;
        if image_id.trim().is_empty() {
            return Err(AppError::Validation("Image ID is required".to_string()));
        }

        let order = self
            .ledger
            .get_by_code(&code, true)
            .await?
            .ok_or(AppError::InvalidCode)?;

        // Order-wide lock: once exhausted, no item yields a URL again,
        // downloaded previously or not.
        if order.used {
            return Err(AppError::CodeAlreadyUsed);
        }

        let item = order
            .item(image_id)
            .ok_or_else(|| AppError::ItemNotInOrder(image_id.to_string()))?;

        let hq_path = match hq_override {
            Some(path) if !path.trim().is_empty() => path.to_string(),
            _ => match nonempty(&item.hq_url) {
                Some(path) => path.to_string(),
                None => {
                    // Upstream data problem: a paid item without its HQ
                    // reference. Never degrade to a preview rendition.
                    tracing::error!(
                        order_id = %order.order_id,
                        image_id = %image_id,
                        "Order item has no HQ asset reference"
                    );
                    return Err(AppError::HqAssetMissing(image_id.to_string()));
                }
            },
        };

        let just_exhausted = self
            .ledger
            .record_download(&order.order_id, image_id)
            .await?;
        if just_exhausted {
            tracing::info!(
                order_id = %order.order_id,
                code = %order.download_code,
                "Final item downloaded, code is now exhausted"
            );
        }

        self.signer
            .sign(&hq_path, &self.policy.asset_bucket, self.policy.asset_ttl)
            .await
    }

    /// Explicitly exhaust a code (client confirmed full receipt out of
    /// band). Idempotent; unknown codes fail with `InvalidCode`.
    pub async fn mark_used(&self, raw_code: &str) -> Result<()> {
        let code = self.require_code(raw_code)?;

        let order = self
            .ledger
            .get_by_code(&code, true)
            .await?
            .ok_or(AppError::InvalidCode)?;

        self.ledger.mark_used(&order.order_id).await
    }

    fn require_code(&self, raw: &str) -> Result<String> {
        let code = normalize_code(raw);
        if code.is_empty() {
            return Err(AppError::Validation(
                "Download code is required".to_string(),
            ));
        }
        Ok(code)
    }

    /// Build the item view for `verify`, signing the preview rendition.
    async fn preview_view(&self, item: &OrderItem) -> Result<DownloadItemView> {
        let preview_source = nonempty(&item.thumbnail_url).or_else(|| nonempty(&item.image_url));

        let thumbnail_url = match preview_source {
            Some(path) => Some(
                self.signer
                    .sign(path, &self.policy.preview_bucket, self.policy.preview_ttl)
                    .await?
                    .url,
            ),
            None => None,
        };

        Ok(DownloadItemView {
            image_id: item.image_id.clone(),
            actress_id: item.actress_id.clone(),
            actress_name: item.actress_name.clone(),
            hq_url: item.hq_url.clone(),
            image_url: item.image_url.clone(),
            thumbnail_url,
            width: item.width,
            height: item.height,
            file_size_mb: item.file_size_mb,
        })
    }
}

fn nonempty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonempty_filters_blank_strings() {
        assert_eq!(nonempty(&Some("  ".to_string())), None);
        assert_eq!(nonempty(&None), None);
        assert_eq!(nonempty(&Some(" /a.jpg ".to_string())), Some("/a.jpg"));
    }
}
