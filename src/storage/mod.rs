//! Signed URL issuance against backing object storage.

pub mod s3;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{AppError, Result};

/// Result of a signing request
#[derive(Debug, Clone)]
pub struct SignedUrl {
    /// The signed URL granting temporary read access to one object
    pub url: String,
    /// How long the URL stays valid
    pub expires_in: Duration,
}

/// Signed URL issuer trait.
///
/// Pure with respect to ledger state: a function of (path, bucket, ttl)
/// plus storage credentials. Failures are reported as
/// `SigningUnavailable`/`Storage`, never as a ledger lookup miss.
#[async_trait]
pub trait UrlSigner: Send + Sync {
    /// Mint a time-limited URL for one object.
    ///
    /// `path` may be a bare database-style path, a full storage URL, or an
    /// `s3://` reference; `bucket` is the default bucket used when the path
    /// does not carry its own.
    async fn sign(&self, path: &str, bucket: &str, ttl: Duration) -> Result<SignedUrl>;
}

/// An object reference resolved out of a stored path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    /// Bucket carried by the path itself, when it is a full URL
    pub bucket: Option<String>,
    /// Object key, without leading slash
    pub key: String,
}

impl ObjectLocation {
    /// Resolve a stored path into bucket + key.
    ///
    /// Accepted forms:
    /// - `/securepic/3/image.jpg` (bare database path)
    /// - `https://host/storage/v1/object/<visibility>/<bucket>/<key>`
    /// - `s3://bucket/key`
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(AppError::Storage("empty object path".to_string()));
        }

        if let Some(rest) = trimmed.strip_prefix("s3://") {
            let (bucket, key) = rest.split_once('/').ok_or_else(|| {
                AppError::Storage(format!("s3 path without object key: {trimmed}"))
            })?;
            if bucket.is_empty() || key.is_empty() {
                return Err(AppError::Storage(format!("unresolvable s3 path: {trimmed}")));
            }
            return Ok(Self {
                bucket: Some(bucket.to_string()),
                key: key.to_string(),
            });
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            // Storage-gateway URL: .../storage/v1/object/<visibility>/<bucket>/<key>
            let tail = trimmed
                .split_once("/storage/v1/object/")
                .map(|(_, tail)| tail)
                .ok_or_else(|| {
                    AppError::Storage(format!("unrecognized storage URL: {trimmed}"))
                })?;
            let mut segments = tail.splitn(3, '/');
            let _visibility = segments.next();
            let bucket = segments.next().filter(|s| !s.is_empty());
            let key = segments.next().filter(|s| !s.is_empty());
            match (bucket, key) {
                (Some(bucket), Some(key)) => {
                    return Ok(Self {
                        bucket: Some(bucket.to_string()),
                        key: key.to_string(),
                    })
                }
                _ => {
                    return Err(AppError::Storage(format!(
                        "could not extract bucket/key from storage URL: {trimmed}"
                    )))
                }
            }
        }

        Ok(Self {
            bucket: None,
            key: trimmed.trim_start_matches('/').to_string(),
        })
    }

    /// Bucket to sign against, falling back to the caller's default.
    pub fn bucket_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.bucket.as_deref().unwrap_or(default)
    }
}
