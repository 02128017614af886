//! S3-compatible URL signer using the rust-s3 crate.
//!
//! Works against AWS S3 and S3-compatible services (MinIO, the Supabase
//! storage gateway, etc.). Configuration via environment variables:
//! - S3_REGION: region (default: us-east-1)
//! - S3_ENDPOINT: custom endpoint URL for S3-compatible services
//! - S3_ACCESS_KEY_ID / S3_SECRET_ACCESS_KEY: dedicated signing credentials
//!   (optional; falls back to the default AWS credential chain)
//! - SIGNING_TIMEOUT_SECS: bound on a single presign call

use async_trait::async_trait;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;
use std::time::Duration;

use super::{ObjectLocation, SignedUrl, UrlSigner};
use crate::config::Config;
use crate::error::{AppError, Result};

// S3 rejects presign expiries beyond seven days.
const MAX_PRESIGN_SECS: u64 = 604_800;

/// Signer backed by an S3-compatible storage service.
pub struct S3Signer {
    region: Region,
    credentials: Credentials,
    use_path_style: bool,
    timeout: Duration,
}

impl S3Signer {
    /// Build a signer from application configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = match (&config.s3_access_key, &config.s3_secret_key) {
            (Some(ak), Some(sk)) => Credentials::new(Some(ak), Some(sk), None, None, None)
                .map_err(|e| AppError::Config(format!("Invalid signing credentials: {}", e)))?,
            _ => Credentials::default().map_err(|e| {
                AppError::Config(format!("Failed to load storage credentials: {}", e))
            })?,
        };

        let region = match &config.s3_endpoint {
            Some(endpoint) => Region::Custom {
                region: config.s3_region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config.s3_region.parse().map_err(|_| {
                AppError::Config(format!("Invalid S3 region: {}", config.s3_region))
            })?,
        };

        // Path-style addressing is what MinIO and the Supabase gateway expect.
        let use_path_style = config.s3_endpoint.is_some();

        Ok(Self {
            region,
            credentials,
            use_path_style,
            timeout: Duration::from_secs(config.signing_timeout_secs),
        })
    }

    /// Fresh bucket handle per signing call, so presigned URLs always carry
    /// current credentials rather than the remaining TTL of stale ones.
    fn signing_bucket(&self, bucket_name: &str) -> Result<Box<Bucket>> {
        let bucket = Bucket::new(bucket_name, self.region.clone(), self.credentials.clone())
            .map_err(|e| AppError::Config(format!("Failed to create signing bucket: {}", e)))?;
        Ok(if self.use_path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }
}

#[async_trait]
impl UrlSigner for S3Signer {
    async fn sign(&self, path: &str, bucket: &str, ttl: Duration) -> Result<SignedUrl> {
        let location = ObjectLocation::parse(path)?;
        let bucket_name = location.bucket_or(bucket);
        let expiry_secs = ttl.as_secs().min(MAX_PRESIGN_SECS) as u32;

        let signing_bucket = self.signing_bucket(bucket_name)?;
        let presign = signing_bucket.presign_get(&location.key, expiry_secs, None);

        let url = match tokio::time::timeout(self.timeout, presign).await {
            Err(_) => {
                return Err(AppError::SigningUnavailable(format!(
                    "presign timed out after {:?} for '{}'",
                    self.timeout, location.key
                )))
            }
            Ok(Err(e)) => {
                return Err(AppError::SigningUnavailable(format!(
                    "failed to presign '{}': {}",
                    location.key, e
                )))
            }
            Ok(Ok(url)) => url,
        };

        tracing::debug!(
            bucket = %bucket_name,
            key = %location.key,
            expires_in_secs = expiry_secs,
            "Generated presigned URL"
        );

        Ok(SignedUrl {
            url,
            expires_in: ttl,
        })
    }
}
