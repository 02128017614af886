//! Postgres-backed order ledger.
//!
//! `record_download` serializes the count-check-and-flip per order with a
//! row lock (`SELECT ... FOR UPDATE`), so the exhaustion transition happens
//! exactly once even when the last two items are logged concurrently.
//!
//! A small code-keyed read cache serves display lookups; forced-refresh
//! reads go straight to Postgres and therefore observe every committed
//! write (the cache is never consulted for security decisions).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::{DownloadEntry, Order, OrderItem};
use crate::services::order_ledger::{normalize_code, OrderLedger};

#[derive(FromRow)]
struct OrderRow {
    order_id: String,
    download_code: String,
    email: String,
    total: f64,
    created_at: DateTime<Utc>,
    used: bool,
}

struct CacheEntry {
    order: Order,
    fetched_at: Instant,
}

impl CacheEntry {
    fn fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Whether a cached entry may serve this lookup. Forced reads never use
/// the cache; unforced reads require an entry younger than the TTL.
fn serve_from_cache(
    entry: Option<&CacheEntry>,
    force_refresh: bool,
    ttl: Duration,
) -> Option<Order> {
    if force_refresh {
        return None;
    }
    entry.filter(|e| e.fresh(ttl)).map(|e| e.order.clone())
}

/// Production ledger over a Postgres pool.
pub struct PgOrderLedger {
    db: PgPool,
    cache: RwLock<HashMap<String, CacheEntry>>,
    cache_ttl: Duration,
}

impl PgOrderLedger {
    pub fn new(db: PgPool, cache_ttl: Duration) -> Self {
        Self {
            db,
            cache: RwLock::new(HashMap::new()),
            cache_ttl,
        }
    }

    async fn load_by_order_id(&self, order_id: &str) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT order_id, download_code, email, total, created_at, used
            FROM orders
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    async fn load_by_code(&self, code: &str) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT order_id, download_code, email, total, created_at, used
            FROM orders
            WHERE download_code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    /// Attach items and the download log to an order row.
    async fn assemble(&self, row: OrderRow) -> Result<Order> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT image_id, actress_id, actress_name, hq_url, image_url,
                   thumbnail_url, width, height, file_size_mb
            FROM order_items
            WHERE order_id = $1
            ORDER BY position
            "#,
        )
        .bind(&row.order_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let downloads = sqlx::query_as::<_, DownloadEntry>(
            r#"
            SELECT image_id, downloaded_at
            FROM order_downloads
            WHERE order_id = $1
            ORDER BY downloaded_at
            "#,
        )
        .bind(&row.order_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Order {
            order_id: row.order_id,
            download_code: row.download_code,
            email: row.email,
            total: row.total,
            created_at: row.created_at,
            used: row.used,
            items,
            downloads,
        })
    }

    async fn cache_put(&self, order: &Order) {
        let mut cache = self.cache.write().await;
        cache.insert(
            order.download_code.clone(),
            CacheEntry {
                order: order.clone(),
                fetched_at: Instant::now(),
            },
        );
    }

    async fn cache_invalidate(&self, code: &str) {
        self.cache.write().await.remove(code);
    }
}

#[async_trait]
impl OrderLedger for PgOrderLedger {
    async fn get_by_order_id(&self, order_id: &str) -> Result<Option<Order>> {
        self.load_by_order_id(order_id).await
    }

    async fn get_by_code(&self, code: &str, force_refresh: bool) -> Result<Option<Order>> {
        let code = normalize_code(code);

        {
            let cache = self.cache.read().await;
            if let Some(order) = serve_from_cache(cache.get(&code), force_refresh, self.cache_ttl) {
                return Ok(Some(order));
            }
        }

        let order = self.load_by_code(&code).await?;
        match &order {
            Some(order) => self.cache_put(order).await,
            None => self.cache_invalidate(&code).await,
        }
        Ok(order)
    }

    async fn record_download(&self, order_id: &str, image_id: &str) -> Result<bool> {
        let mut tx = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Row lock: all count-and-flip logic below runs single-writer
        // per order.
        let locked: Option<(bool, String)> = sqlx::query_as(
            "SELECT used, download_code FROM orders WHERE order_id = $1 FOR UPDATE",
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let Some((was_used, download_code)) = locked else {
            return Ok(false);
        };

        sqlx::query(
            r#"
            INSERT INTO order_downloads (order_id, image_id)
            VALUES ($1, $2)
            ON CONFLICT (order_id, image_id) DO NOTHING
            "#,
        )
        .bind(order_id)
        .bind(image_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let (downloaded,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM order_downloads WHERE order_id = $1")
                .bind(order_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM order_items WHERE order_id = $1")
                .bind(order_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        let mut just_exhausted = false;
        if !was_used && total > 0 && downloaded >= total {
            let updated = sqlx::query(
                "UPDATE orders SET used = TRUE WHERE order_id = $1 AND used = FALSE",
            )
            .bind(order_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
            just_exhausted = updated.rows_affected() == 1;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.cache_invalidate(&download_code).await;

        if just_exhausted {
            tracing::info!(
                order_id = %order_id,
                "All images downloaded, download code exhausted"
            );
        }

        Ok(just_exhausted)
    }

    async fn mark_used(&self, order_id: &str) -> Result<()> {
        let code: Option<String> = sqlx::query_scalar(
            "UPDATE orders SET used = TRUE WHERE order_id = $1 RETURNING download_code",
        )
        .bind(order_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(code) = code {
            self.cache_invalidate(&code).await;
            tracing::info!(order_id = %order_id, "Order marked as used");
        }

        Ok(())
    }
}
