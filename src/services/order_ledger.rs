//! Order ledger port: the only component allowed to mutate an order.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Order;

/// Durable store of order records, indexed by order id and download code.
///
/// Absence is a valid query result, not an error: lookups return `Ok(None)`
/// and `record_download` on an unknown order returns `Ok(false)`.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Fetch an order by its internal id.
    async fn get_by_order_id(&self, order_id: &str) -> Result<Option<Order>>;

    /// Fetch an order by download code (case-insensitive).
    ///
    /// `force_refresh` bypasses any read cache so the caller observes the
    /// latest `used`/download state. Every security decision must pass
    /// `true` here; the cached path exists only for display reads.
    async fn get_by_code(&self, code: &str, force_refresh: bool) -> Result<Option<Order>>;

    /// Idempotently record that `image_id` was retrieved for `order_id`,
    /// and flip the order to used when this call makes the distinct
    /// download count equal the item count.
    ///
    /// Returns `true` iff this call caused the exhaustion flip. The count
    /// check and the flip happen in one atomic step, so racing calls for
    /// the last two items produce exactly one `true`.
    async fn record_download(&self, order_id: &str, image_id: &str) -> Result<bool>;

    /// Explicit administrative exhaustion, independent of per-item counts.
    async fn mark_used(&self, order_id: &str) -> Result<()>;
}

/// Normalize a submitted download code: codes are stored uppercase and
/// compared case-insensitively.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}
