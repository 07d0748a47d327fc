//! Warehouse capability traits.
//!
//! The bulk-load engine and the metadata store are external services. They
//! are reached through explicitly constructed, passed-in handles so tests can
//! substitute fakes; no module-level client state.

mod bigquery;

pub use bigquery::{BigQueryClient, DEFAULT_ENDPOINT};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::WarehouseError;
use crate::ledger::LedgerEntry;
use crate::schema::TableSchema;

/// Fully-qualified identifier of a warehouse table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableId {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableId {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    /// The ledger metadata table associated with this destination.
    pub fn metadata_table(&self) -> TableId {
        TableId {
            project: self.project.clone(),
            dataset: self.dataset.clone(),
            table: format!("{}_metadata", self.table),
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// Reference-counted bulk loader handle.
pub type BulkLoaderRef = Arc<dyn BulkLoader>;

/// Reference-counted metadata store handle.
pub type MetadataStoreRef = Arc<dyn MetadataStore>;

/// The warehouse bulk-load capability.
///
/// Ingests one delimited file into a destination table under an explicit
/// schema. Implementations must skip exactly one header row and append to
/// existing destination data, never overwrite or truncate it.
#[async_trait]
pub trait BulkLoader: Send + Sync {
    /// Load one CSV file and return the number of rows loaded.
    ///
    /// Blocks until the load operation completes or fails.
    async fn load_csv(
        &self,
        source_uri: &str,
        destination: &TableId,
        schema: &TableSchema,
    ) -> Result<u64, WarehouseError>;
}

/// The warehouse metadata-store capability backing the ledger.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Create the table if it does not exist.
    ///
    /// Idempotent: concurrent creators must neither fail nor duplicate.
    async fn ensure_table(&self, table: &TableId, schema: &TableSchema)
        -> Result<(), WarehouseError>;

    /// Distinct source files recorded in the given metadata table.
    ///
    /// Returns `WarehouseError::TableNotFound` when the table does not exist,
    /// so callers can distinguish "no metadata yet" from a real outage.
    async fn query_source_files(&self, table: &TableId) -> Result<Vec<String>, WarehouseError>;

    /// Append ledger entries to the given metadata table.
    async fn insert_entries(
        &self,
        table: &TableId,
        entries: &[LedgerEntry],
    ) -> Result<(), WarehouseError>;
}
