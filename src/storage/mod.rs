//! Object storage abstraction for source CSV listing.
//!
//! Wraps the `object_store` crate behind a small provider that knows how to
//! construct a backend from a URL (GCS, S3, or a local directory) and list
//! the CSV files under a configured prefix.

mod url_parser;

pub use url_parser::BackendConfig;

use std::collections::HashMap;
use std::sync::Arc;

use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::{ObjectStore, RetryConfig};
use snafu::prelude::*;
use tracing::debug;

use crate::error::{GcsConfigSnafu, LocalConfigSnafu, ObjectStoreSnafu, S3ConfigSnafu, StorageError};

/// A reference-counted storage provider.
pub type StorageRef = Arc<Storage>;

/// Storage provider that abstracts over cloud storage backends.
pub struct Storage {
    object_store: Arc<dyn ObjectStore>,
    /// Key prefix all listings are scoped to (e.g. "Distribuidor_001").
    prefix: Option<Path>,
    canonical_url: String,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Storage<{}>", self.canonical_url)
    }
}

impl Storage {
    /// Create a storage provider for the given URL, scoped to `prefix`.
    ///
    /// The prefix from the URL path (if any) and the explicit `prefix`
    /// argument are joined, so `gs://bucket/dist` with prefix `"2024"` lists
    /// under `dist/2024`.
    pub fn for_url(
        url: &str,
        prefix: &str,
        options: &HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        let config = BackendConfig::parse_url(url)?;
        let full_prefix = join_prefix(config.prefix(), prefix);

        let (object_store, canonical_url): (Arc<dyn ObjectStore>, String) = match &config {
            BackendConfig::Gcs { bucket, .. } => {
                let mut builder = GoogleCloudStorageBuilder::from_env()
                    .with_bucket_name(bucket)
                    .with_retry(RetryConfig::default());
                if let Ok(service_account_key) = std::env::var("GOOGLE_SERVICE_ACCOUNT_KEY") {
                    debug!("Constructing GCS builder with service account key");
                    builder = builder.with_service_account_key(&service_account_key);
                }
                let store = builder.build().context(GcsConfigSnafu)?;
                (Arc::new(store), format!("gs://{bucket}"))
            }
            BackendConfig::S3 { bucket, .. } => {
                let mut builder = AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .with_retry(RetryConfig::default());
                for (key, value) in options {
                    builder = builder.with_config(
                        key.parse().map_err(|source| StorageError::S3Config { source })?,
                        value,
                    );
                }
                let store = builder.build().context(S3ConfigSnafu)?;
                (Arc::new(store), format!("s3://{bucket}"))
            }
            BackendConfig::Local { path } => {
                let store = LocalFileSystem::new_with_prefix(path).context(LocalConfigSnafu)?;
                (Arc::new(store), path.clone())
            }
        };

        Ok(Self {
            object_store,
            prefix: full_prefix,
            canonical_url,
        })
    }

    /// Create a storage provider over an existing object store.
    ///
    /// Used by tests to substitute an in-memory store.
    pub fn from_store(object_store: Arc<dyn ObjectStore>, prefix: Option<&str>) -> Self {
        Self {
            object_store,
            prefix: prefix.map(Path::from),
            canonical_url: "memory://".to_string(),
        }
    }

    /// List all CSV files under the configured prefix.
    ///
    /// Returns full object keys in listing order, filtered to the `.csv`
    /// extension case-insensitively. Subdirectories are included.
    pub async fn list_csv_files(&self) -> Result<Vec<String>, StorageError> {
        let listing: Vec<String> = self
            .object_store
            .list(self.prefix.as_ref())
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await
            .context(ObjectStoreSnafu)?;

        let files: Vec<String> = listing
            .into_iter()
            .filter(|name| name.to_lowercase().ends_with(".csv"))
            .collect();

        debug!(
            url = %self.canonical_url,
            files = files.len(),
            "Listed source CSV files"
        );

        Ok(files)
    }

    /// The canonical URL of the backing store (without prefix).
    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }
}

/// Join the URL-derived prefix and the configured prefix.
fn join_prefix(url_prefix: Option<&str>, extra: &str) -> Option<Path> {
    let extra = extra.trim_matches('/');
    match (url_prefix, extra.is_empty()) {
        (None, true) => None,
        (None, false) => Some(Path::from(extra)),
        (Some(p), true) => Some(Path::from(p)),
        (Some(p), false) => Some(Path::from(format!("{p}/{extra}"))),
    }
}
