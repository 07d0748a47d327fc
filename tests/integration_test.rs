//! Integration tests for cargadero

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};

use cargadero::classify::Category;
use cargadero::error::WarehouseError;
use cargadero::ledger::LedgerEntry;
use cargadero::pipeline::CategoryStatus;
use cargadero::schema::TableSchema;
use cargadero::warehouse::{BulkLoader, MetadataStore, TableId};
use cargadero::{Config, Coordinator, Ledger, Loader, Storage};

/// Bulk loader fake with a scripted failure list and a call log.
#[derive(Default)]
struct FakeBulkLoader {
    uris: Mutex<Vec<String>>,
    fail_substring: Option<String>,
}

impl FakeBulkLoader {
    fn failing_on(substring: &str) -> Self {
        Self {
            uris: Mutex::new(Vec::new()),
            fail_substring: Some(substring.to_string()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.uris.lock().unwrap().clone()
    }
}

#[async_trait]
impl BulkLoader for FakeBulkLoader {
    async fn load_csv(
        &self,
        source_uri: &str,
        _destination: &TableId,
        _schema: &TableSchema,
    ) -> Result<u64, WarehouseError> {
        self.uris.lock().unwrap().push(source_uri.to_string());
        if let Some(bad) = &self.fail_substring {
            if source_uri.contains(bad.as_str()) {
                return Err(WarehouseError::JobFailed {
                    reason: "CSV table references column position 6, but line contains only 4 columns"
                        .to_string(),
                });
            }
        }
        Ok(5)
    }
}

/// Metadata store fake: tables exist only once created, and the whole store
/// can be switched to an unreachable state.
#[derive(Default)]
struct FakeMetadataStore {
    tables: Mutex<HashMap<String, Vec<LedgerEntry>>>,
    unreachable: Mutex<bool>,
}

impl FakeMetadataStore {
    fn set_unreachable(&self, value: bool) {
        *self.unreachable.lock().unwrap() = value;
    }

    fn source_files(&self, table: &str) -> Vec<String> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map(|entries| entries.iter().map(|e| e.source_file.clone()).collect())
            .unwrap_or_default()
    }

    fn check_reachable(&self) -> Result<(), WarehouseError> {
        if *self.unreachable.lock().unwrap() {
            return Err(WarehouseError::Api {
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for FakeMetadataStore {
    async fn ensure_table(
        &self,
        table: &TableId,
        _schema: &TableSchema,
    ) -> Result<(), WarehouseError> {
        self.check_reachable()?;
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default();
        Ok(())
    }

    async fn query_source_files(&self, table: &TableId) -> Result<Vec<String>, WarehouseError> {
        self.check_reachable()?;
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
        self.check_reachable()?;
        self.tables
            .lock()
            .unwrap()
            .get_mut(&table.to_string())
            .expect("insert into missing table")
            .extend_from_slice(entries);
        Ok(())
    }
}

fn test_config() -> Config {
    Config::parse(
        r#"
warehouse:
  project: usm-infra-grupo9
  dataset: semi_raw
source:
  url: gs://argentina_ideal
  prefix: Distribuidor_001/
destinations:
  sales: Venta
  stock: Stock
  customer: Cliente
"#,
    )
    .unwrap()
}

async fn seed_store(keys: &[&str]) -> Arc<InMemory> {
    let store = Arc::new(InMemory::new());
    for key in keys {
        store
            .put(&Path::from(*key), PutPayload::from_static(b"a,b\n1,2\n"))
            .await
            .unwrap();
    }
    store
}

struct Harness {
    bulk: Arc<FakeBulkLoader>,
    store: Arc<FakeMetadataStore>,
    coordinator: Coordinator,
}

fn harness(object_store: Arc<InMemory>, bulk: FakeBulkLoader) -> Harness {
    let bulk = Arc::new(bulk);
    let store = Arc::new(FakeMetadataStore::default());
    let storage = Arc::new(Storage::from_store(object_store, Some("Distribuidor_001")));
    let ledger = Ledger::new(store.clone());
    let loader = Loader::new(bulk.clone(), ledger.clone(), storage.canonical_url());
    let coordinator = Coordinator::new(storage, ledger, loader, test_config());
    Harness {
        bulk,
        store,
        coordinator,
    }
}

mod run_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_run_loads_each_category() {
        let object_store = seed_store(&[
            "Distribuidor_001/venta_enero.csv",
            "Distribuidor_001/stock_enero.csv",
            "Distribuidor_001/cliente_enero.csv",
            "Distribuidor_001/deuda_enero.csv",
            "Distribuidor_001/notas.txt",
            "Distribuidor_001/resumen.csv",
        ])
        .await;
        let h = harness(object_store, FakeBulkLoader::default());

        let summary = h.coordinator.run().await.unwrap();

        // Fixed order: sales, stock, customer
        let categories: Vec<Category> =
            summary.categories().iter().map(|c| c.category).collect();
        assert_eq!(
            categories,
            [Category::Sales, Category::Stock, Category::Customer]
        );
        assert_eq!(summary.files_loaded(), 4);
        assert_eq!(summary.rows_loaded(), 20);
        assert!(summary.failures().is_empty());
        // resumen.csv matches no rule
        assert_eq!(summary.discarded(), 1);

        // cliente and deuda both land in the customer destination
        let customer = &summary.categories()[2];
        assert_eq!(customer.destination.to_string(), "usm-infra-grupo9.semi_raw.Cliente");
        match &customer.status {
            CategoryStatus::Loaded(reports) => {
                let files: Vec<_> = reports.iter().map(|r| r.file.as_str()).collect();
                assert_eq!(
                    files,
                    [
                        "Distribuidor_001/cliente_enero.csv",
                        "Distribuidor_001/deuda_enero.csv"
                    ]
                );
            }
            other => panic!("expected Loaded, got {other:?}"),
        }

        // Ledger holds one entry per loaded file, keyed per destination
        assert_eq!(
            h.store.source_files("usm-infra-grupo9.semi_raw.Venta_metadata"),
            ["Distribuidor_001/venta_enero.csv"]
        );
        assert_eq!(
            h.store
                .source_files("usm-infra-grupo9.semi_raw.Cliente_metadata")
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let object_store = seed_store(&[
            "Distribuidor_001/venta_enero.csv",
            "Distribuidor_001/stock_enero.csv",
        ])
        .await;
        let h = harness(object_store, FakeBulkLoader::default());

        h.coordinator.run().await.unwrap();
        assert_eq!(h.bulk.calls().len(), 2);

        let summary = h.coordinator.run().await.unwrap();

        // No further load calls, every non-empty category reports AllProcessed
        assert_eq!(h.bulk.calls().len(), 2);
        assert_eq!(summary.files_loaded(), 0);
        assert!(matches!(
            summary.categories()[0].status,
            CategoryStatus::AllProcessed
        ));
        assert!(matches!(
            summary.categories()[1].status,
            CategoryStatus::AllProcessed
        ));
        assert!(matches!(
            summary.categories()[2].status,
            CategoryStatus::NoneFound
        ));
    }

    #[tokio::test]
    async fn test_new_file_between_runs_is_picked_up() {
        let object_store = seed_store(&["Distribuidor_001/venta_enero.csv"]).await;
        let h = harness(object_store.clone(), FakeBulkLoader::default());

        h.coordinator.run().await.unwrap();

        object_store
            .put(
                &Path::from("Distribuidor_001/venta_febrero.csv"),
                PutPayload::from_static(b"a,b\n1,2\n"),
            )
            .await
            .unwrap();

        let summary = h.coordinator.run().await.unwrap();

        assert_eq!(summary.files_loaded(), 1);
        let calls = h.bulk.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].ends_with("venta_febrero.csv"));
    }

    #[tokio::test]
    async fn test_empty_category_never_invokes_loader() {
        let object_store = seed_store(&["Distribuidor_001/venta_enero.csv"]).await;
        let h = harness(object_store, FakeBulkLoader::default());

        let summary = h.coordinator.run().await.unwrap();

        assert!(matches!(
            summary.categories()[1].status,
            CategoryStatus::NoneFound
        ));
        assert!(matches!(
            summary.categories()[2].status,
            CategoryStatus::NoneFound
        ));
        // Only the sales file reached the bulk loader
        assert_eq!(h.bulk.calls().len(), 1);
    }
}

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_file_is_retried_on_the_next_run() {
        let object_store = seed_store(&[
            "Distribuidor_001/venta_01.csv",
            "Distribuidor_001/venta_02_mala.csv",
            "Distribuidor_001/venta_03.csv",
        ])
        .await;
        let h = harness(object_store, FakeBulkLoader::failing_on("mala"));

        let summary = h.coordinator.run().await.unwrap();

        // The failure neither aborts the batch nor reaches the ledger
        assert_eq!(summary.files_loaded(), 2);
        assert_eq!(summary.failures().len(), 1);
        assert_eq!(summary.failures()[0].file, "Distribuidor_001/venta_02_mala.csv");
        assert_eq!(
            h.store.source_files("usm-infra-grupo9.semi_raw.Venta_metadata"),
            [
                "Distribuidor_001/venta_01.csv",
                "Distribuidor_001/venta_03.csv"
            ]
        );

        // The next run retries exactly the failed file
        let summary = h.coordinator.run().await.unwrap();
        let calls = h.bulk.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls[3].ends_with("venta_02_mala.csv"));
        assert_eq!(summary.files_loaded(), 0);
        assert_eq!(summary.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_ledger_degrades_to_reload() {
        let object_store = seed_store(&["Distribuidor_001/venta_enero.csv"]).await;
        let h = harness(object_store, FakeBulkLoader::default());

        h.coordinator.run().await.unwrap();
        h.store.set_unreachable(true);

        let summary = h.coordinator.run().await.unwrap();

        // With the ledger down every candidate is treated as new, so the
        // already loaded file is appended again rather than skipped.
        assert_eq!(h.bulk.calls().len(), 2);
        assert_eq!(summary.files_loaded(), 1);
    }

    #[tokio::test]
    async fn test_ledger_append_failure_does_not_fail_the_file() {
        let object_store = seed_store(&["Distribuidor_001/venta_enero.csv"]).await;
        let h = harness(object_store, FakeBulkLoader::default());

        // Queries fail over to "all new"; record() also fails, but the load
        // itself still counts as a success for this run.
        h.store.set_unreachable(true);
        let summary = h.coordinator.run().await.unwrap();

        assert_eq!(summary.files_loaded(), 1);
        assert!(summary.failures().is_empty());
        assert!(h
            .store
            .source_files("usm-infra-grupo9.semi_raw.Venta_metadata")
            .is_empty());
    }
}

mod classification_tests {
    use super::*;

    #[tokio::test]
    async fn test_each_file_lands_in_exactly_one_category() {
        let object_store = seed_store(&[
            "Distribuidor_001/VENTA_MAYO.CSV",
            "Distribuidor_001/stock_cliente.csv",
            "Distribuidor_001/deuda_vieja.csv",
        ])
        .await;
        let h = harness(object_store, FakeBulkLoader::default());

        let summary = h.coordinator.run().await.unwrap();

        // First match in rule order wins: "stock_cliente" is stock only
        assert_eq!(summary.files_loaded(), 3);
        assert_eq!(h.bulk.calls().len(), 3);
        assert_eq!(
            h.store.source_files("usm-infra-grupo9.semi_raw.Stock_metadata"),
            ["Distribuidor_001/stock_cliente.csv"]
        );
        assert_eq!(
            h.store.source_files("usm-infra-grupo9.semi_raw.Cliente_metadata"),
            ["Distribuidor_001/deuda_vieja.csv"]
        );
    }
}
