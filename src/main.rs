//! Photo Vault Backend - Main Entry Point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use photo_vault_backend::{
    api,
    config::Config,
    db,
    error::Result,
    services::pg_ledger::PgOrderLedger,
    storage::s3::S3Signer,
    telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing (guard must live until shutdown to flush spans)
    let _otel_guard =
        telemetry::init_tracing(config.otel_endpoint.as_deref(), "photo-vault-backend");
    tracing::info!("Starting Photo Vault backend");

    // Connect to database
    let db_pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&db_pool).await?;
    tracing::info!("Database migrations complete");

    // Order ledger and signed URL issuer
    let ledger = Arc::new(PgOrderLedger::new(
        db_pool.clone(),
        Duration::from_secs(config.ledger_cache_ttl_secs),
    ));
    let signer = Arc::new(S3Signer::from_config(&config)?);

    let state = Arc::new(api::AppState::new(config.clone(), db_pool, ledger, signer));

    // Build router
    let app = api::routes::create_router(state)
        .layer({
            // In production the storefront is served from the same origin.
            // In development the Next.js dev server runs on a different
            // port, so that origin must be whitelisted with credentials.
            if std::env::var("ENVIRONMENT").unwrap_or_default() == "development" {
                let origins: Vec<_> = std::env::var("CORS_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000".into())
                    .split(',')
                    .map(|s| s.trim().parse().expect("invalid CORS origin"))
                    .collect();
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                    .allow_credentials(true)
            } else {
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        })
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
