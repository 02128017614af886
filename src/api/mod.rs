//! API module - HTTP handlers and routing.

pub mod handlers;
pub mod routes;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::services::download_service::{DownloadService, UrlPolicy};
use crate::services::order_ledger::OrderLedger;
use crate::storage::UrlSigner;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: PgPool,
    pub ledger: Arc<dyn OrderLedger>,
    pub signer: Arc<dyn UrlSigner>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: PgPool,
        ledger: Arc<dyn OrderLedger>,
        signer: Arc<dyn UrlSigner>,
    ) -> Self {
        Self {
            config,
            db,
            ledger,
            signer,
        }
    }

    /// Create a DownloadService wired to the shared ledger and signer.
    pub fn download_service(&self) -> DownloadService {
        DownloadService::new(
            self.ledger.clone(),
            self.signer.clone(),
            UrlPolicy::from_config(&self.config),
        )
    }
}

pub type SharedState = Arc<AppState>;
