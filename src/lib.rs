//! Cargadero: incremental loader for CSV files landed in object storage.
//!
//! This crate handles:
//! - Listing CSV files under a bucket prefix (GCS, S3, local)
//! - Classifying files into sales / stock / customer categories by name
//! - Diffing each category against a per-destination ledger of loaded files
//! - Bulk-loading new files into warehouse tables under fixed schemas
//! - Recording completions so repeated runs never reprocess a file

pub mod classify;
pub mod config;
pub mod error;
pub mod ledger;
pub mod loader;
pub mod pipeline;
pub mod schema;
pub mod storage;
pub mod tracing;
pub mod warehouse;

// Re-export commonly used items
pub use classify::{Category, Classified};
pub use config::Config;
pub use error::RunError;
pub use ledger::{Ledger, LedgerEntry};
pub use loader::{LoadOutcome, Loader};
pub use pipeline::{Coordinator, RunSummary};
pub use storage::{Storage, StorageRef};
pub use tracing::init_tracing;
pub use warehouse::{BigQueryClient, BulkLoader, MetadataStore, TableId};
