//! Durable ledger of loaded source files.
//!
//! One metadata table per destination records which source files have
//! completed loading. Entries are written exactly once, only after the
//! corresponding load has durably succeeded, and are never updated or
//! deleted, so the set of loaded files only grows.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use snafu::prelude::*;
use tracing::debug;

use crate::error::{AppendSnafu, CreateTableSnafu, LedgerError, QuerySnafu, WarehouseError};
use crate::schema::ledger_schema;
use crate::warehouse::{MetadataStoreRef, TableId};

/// One completed load, recorded in the destination's metadata table.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    /// Full object key of the loaded source file.
    pub source_file: String,
    /// When the load completed.
    pub process_date: DateTime<Utc>,
    /// Rows the load job reported.
    pub rows_loaded: u64,
}

impl LedgerEntry {
    /// Create an entry stamped with the current time.
    pub fn now(source_file: impl Into<String>, rows_loaded: u64) -> Self {
        Self {
            source_file: source_file.into(),
            process_date: Utc::now(),
            rows_loaded,
        }
    }
}

/// Per-destination record of which source files have completed loading.
///
/// The ledger is the only writer of metadata entries; the loader triggers
/// writes but never touches the store directly.
#[derive(Clone)]
pub struct Ledger {
    store: MetadataStoreRef,
}

impl Ledger {
    pub fn new(store: MetadataStoreRef) -> Self {
        Self { store }
    }

    /// All source files with a durable entry for the given destination.
    ///
    /// A missing metadata table means no file has been loaded yet (first
    /// run) and yields an empty set. A store failure is surfaced as an
    /// error so the caller can decide how to degrade.
    pub async fn already_loaded(
        &self,
        destination: &TableId,
    ) -> Result<HashSet<String>, LedgerError> {
        let metadata_table = destination.metadata_table();

        match self.store.query_source_files(&metadata_table).await {
            Ok(files) => {
                debug!(
                    table = %metadata_table,
                    loaded = files.len(),
                    "Queried ledger"
                );
                Ok(files.into_iter().collect())
            }
            Err(WarehouseError::TableNotFound { table }) => {
                debug!(table = %table, "No ledger yet for destination");
                Ok(HashSet::new())
            }
            Err(source) => Err(source).context(QuerySnafu),
        }
    }

    /// Append one entry for a successfully loaded file.
    ///
    /// Creates the metadata table first if it does not exist. Must be called
    /// only after the corresponding load has been confirmed successful.
    pub async fn record(
        &self,
        destination: &TableId,
        entry: LedgerEntry,
    ) -> Result<(), LedgerError> {
        let metadata_table = destination.metadata_table();

        self.store
            .ensure_table(&metadata_table, ledger_schema())
            .await
            .context(CreateTableSnafu)?;

        self.store
            .insert_entries(&metadata_table, std::slice::from_ref(&entry))
            .await
            .context(AppendSnafu)?;

        debug!(
            table = %metadata_table,
            source_file = %entry.source_file,
            rows_loaded = entry.rows_loaded,
            "Recorded ledger entry"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableSchema;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Metadata store fake: tables exist only once created.
    #[derive(Default)]
    struct FakeStore {
        tables: Mutex<HashMap<String, Vec<LedgerEntry>>>,
        fail_queries: bool,
    }

    #[async_trait]
    impl crate::warehouse::MetadataStore for FakeStore {
        async fn ensure_table(
            &self,
            table: &TableId,
            _schema: &TableSchema,
        ) -> Result<(), WarehouseError> {
            self.tables
                .lock()
                .unwrap()
                .entry(table.to_string())
                .or_default();
            Ok(())
        }

        async fn query_source_files(
            &self,
            table: &TableId,
        ) -> Result<Vec<String>, WarehouseError> {
            if self.fail_queries {
                return Err(WarehouseError::Api {
                    status: 500,
                    message: "backend unavailable".to_string(),
                });
            }
            let tables = self.tables.lock().unwrap();
            match tables.get(&table.to_string()) {
                Some(entries) => Ok(entries.iter().map(|e| e.source_file.clone()).collect()),
                None => Err(WarehouseError::TableNotFound {
                    table: table.to_string(),
                }),
            }
        }

        async fn insert_entries(
            &self,
            table: &TableId,
            entries: &[LedgerEntry],
        ) -> Result<(), WarehouseError> {
            self.tables
                .lock()
                .unwrap()
                .get_mut(&table.to_string())
                .expect("insert into missing table")
                .extend_from_slice(entries);
            Ok(())
        }
    }

    fn destination() -> TableId {
        TableId::new("p", "d", "Venta")
    }

    #[tokio::test]
    async fn test_already_loaded_missing_table_is_empty() {
        let ledger = Ledger::new(Arc::new(FakeStore::default()));
        let loaded = ledger.already_loaded(&destination()).await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_record_then_query() {
        let ledger = Ledger::new(Arc::new(FakeStore::default()));

        ledger
            .record(&destination(), LedgerEntry::now("dist/venta_enero.csv", 42))
            .await
            .unwrap();

        let loaded = ledger.already_loaded(&destination()).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains("dist/venta_enero.csv"));
    }

    #[tokio::test]
    async fn test_record_creates_table_once() {
        let store = Arc::new(FakeStore::default());
        let ledger = Ledger::new(store.clone());

        ledger
            .record(&destination(), LedgerEntry::now("dist/venta_enero.csv", 1))
            .await
            .unwrap();
        ledger
            .record(&destination(), LedgerEntry::now("dist/venta_febrero.csv", 2))
            .await
            .unwrap();

        let tables = store.tables.lock().unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables["p.d.Venta_metadata"].len(), 2);
    }

    #[tokio::test]
    async fn test_query_failure_is_an_error_not_empty() {
        let store = FakeStore {
            fail_queries: true,
            ..FakeStore::default()
        };
        let ledger = Ledger::new(Arc::new(store));

        let err = ledger.already_loaded(&destination()).await.unwrap_err();
        assert!(matches!(err, LedgerError::Query { .. }));
    }
}
