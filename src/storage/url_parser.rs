//! Storage URL parsing.
//!
//! Supports `gs://bucket/prefix`, `s3://bucket/prefix`, and bare local paths.

use crate::error::StorageError;

/// Parsed storage backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Gcs {
        bucket: String,
        prefix: Option<String>,
    },
    S3 {
        bucket: String,
        prefix: Option<String>,
    },
    Local {
        path: String,
    },
}

impl BackendConfig {
    /// Parse a storage URL into a backend configuration.
    pub fn parse_url(url: &str) -> Result<Self, StorageError> {
        if let Some(rest) = url.strip_prefix("gs://") {
            let (bucket, prefix) = split_bucket(rest, url)?;
            return Ok(BackendConfig::Gcs { bucket, prefix });
        }
        if let Some(rest) = url.strip_prefix("s3://") {
            let (bucket, prefix) = split_bucket(rest, url)?;
            return Ok(BackendConfig::S3 { bucket, prefix });
        }
        if url.contains("://") {
            return Err(StorageError::InvalidUrl {
                url: url.to_string(),
            });
        }
        if url.is_empty() {
            return Err(StorageError::InvalidUrl {
                url: url.to_string(),
            });
        }
        Ok(BackendConfig::Local {
            path: url.to_string(),
        })
    }

    /// The key prefix embedded in the URL path, if any.
    pub fn prefix(&self) -> Option<&str> {
        match self {
            BackendConfig::Gcs { prefix, .. } | BackendConfig::S3 { prefix, .. } => {
                prefix.as_deref()
            }
            BackendConfig::Local { .. } => None,
        }
    }
}

/// Split `bucket/key/parts` into bucket and optional prefix.
fn split_bucket(rest: &str, url: &str) -> Result<(String, Option<String>), StorageError> {
    let (bucket, prefix) = match rest.split_once('/') {
        Some((bucket, key)) => {
            let key = key.trim_matches('/');
            let prefix = (!key.is_empty()).then(|| key.to_string());
            (bucket, prefix)
        }
        None => (rest, None),
    };

    if bucket.is_empty() {
        return Err(StorageError::InvalidUrl {
            url: url.to_string(),
        });
    }

    Ok((bucket.to_string(), prefix))
}
