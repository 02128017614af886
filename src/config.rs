//! Application configuration loaded from environment variables.

use crate::error::{AppError, Result};
use std::env;

/// Application configuration
#[derive(Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Server bind address (host:port)
    pub bind_address: String,

    /// Bucket holding the paid high-resolution originals (private)
    pub asset_bucket: String,

    /// Bucket holding preview/thumbnail renditions
    pub preview_bucket: String,

    /// S3 region
    pub s3_region: String,

    /// S3 endpoint URL (for MinIO or other S3-compatible services)
    pub s3_endpoint: Option<String>,

    /// Dedicated access key for presigned URL signing (optional,
    /// overrides the default credential chain)
    pub s3_access_key: Option<String>,

    /// Dedicated secret key for presigned URL signing (optional)
    pub s3_secret_key: Option<String>,

    /// TTL for signed preview URLs, in seconds
    pub preview_url_ttl_secs: u64,

    /// TTL for signed HQ asset URLs, in seconds
    pub asset_url_ttl_secs: u64,

    /// Upper bound on a single presign call before it is reported
    /// as SigningUnavailable, in seconds
    pub signing_timeout_secs: u64,

    /// Read-cache TTL for non-security order lookups, in seconds
    pub ledger_cache_ttl_secs: u64,

    /// OTLP endpoint for span export (optional)
    pub otel_endpoint: Option<String>,
}

redacted_debug!(Config {
    show database_url,
    show bind_address,
    show asset_bucket,
    show preview_bucket,
    show s3_region,
    show s3_endpoint,
    show s3_access_key,
    redact_option s3_secret_key,
    show preview_url_ttl_secs,
    show asset_url_ttl_secs,
    show signing_timeout_secs,
    show ledger_cache_ttl_secs,
    show otel_endpoint,
});

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| AppError::Config("DATABASE_URL not set".into()))?,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            asset_bucket: env::var("ASSET_BUCKET").unwrap_or_else(|_| "photo-masters".into()),
            preview_bucket: env::var("PREVIEW_BUCKET").unwrap_or_else(|_| "photo-previews".into()),
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            s3_access_key: env::var("S3_ACCESS_KEY_ID").ok(),
            s3_secret_key: env::var("S3_SECRET_ACCESS_KEY").ok(),
            preview_url_ttl_secs: env_u64("PREVIEW_URL_TTL_SECS", 60),
            asset_url_ttl_secs: env_u64("ASSET_URL_TTL_SECS", 300),
            signing_timeout_secs: env_u64("SIGNING_TIMEOUT_SECS", 10),
            ledger_cache_ttl_secs: env_u64("LEDGER_CACHE_TTL_SECS", 30),
            otel_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
