//! Sequential CSV loader for one category batch.
//!
//! Loads each file through the bulk-load capability and records completions
//! in the ledger. Files load strictly one at a time so a mid-batch crash
//! leaves the ledger consistent with exactly the files that finished.

use tracing::{info, warn};

use crate::ledger::{Ledger, LedgerEntry};
use crate::schema::TableSchema;
use crate::warehouse::{BulkLoaderRef, TableId};

/// Result of one load attempt. Transient, not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Success { rows_loaded: u64 },
    Failure { reason: String },
}

impl LoadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoadOutcome::Success { .. })
    }
}

/// Outcome of one file within a category batch.
#[derive(Debug, Clone)]
pub struct FileReport {
    /// Full object key of the source file.
    pub file: String,
    pub outcome: LoadOutcome,
}

/// Loads batches of source files into a destination table.
pub struct Loader {
    bulk_loader: BulkLoaderRef,
    ledger: Ledger,
    /// Base URL files are addressed under (e.g. "gs://argentina_ideal").
    source_base_url: String,
}

impl Loader {
    pub fn new(bulk_loader: BulkLoaderRef, ledger: Ledger, source_base_url: &str) -> Self {
        Self {
            bulk_loader,
            ledger,
            source_base_url: source_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The fully-qualified URI for a source object key.
    fn source_uri(&self, file: &str) -> String {
        format!("{}/{}", self.source_base_url, file.trim_start_matches('/'))
    }

    /// Load the given files into `destination`, one at a time, in order.
    ///
    /// Callers filter already-loaded files beforehand and never pass an
    /// empty batch. One file's failure does not abort the batch: the file
    /// is reported as failed, left out of the ledger so the next run
    /// retries it, and processing continues.
    pub async fn load(
        &self,
        files: &[String],
        destination: &TableId,
        schema: &TableSchema,
    ) -> Vec<FileReport> {
        info!(
            destination = %destination,
            files = files.len(),
            "Loading files"
        );

        let mut reports = Vec::with_capacity(files.len());

        for file in files {
            let uri = self.source_uri(file);
            info!(destination = %destination, file = %file, "Processing file");

            let outcome = match self.bulk_loader.load_csv(&uri, destination, schema).await {
                Ok(rows_loaded) => {
                    // The load is durable; a failed ledger append only risks
                    // reprocessing on the next run, so it must not fail the
                    // file or the batch, but operators need to see it.
                    if let Err(e) = self
                        .ledger
                        .record(destination, LedgerEntry::now(file.clone(), rows_loaded))
                        .await
                    {
                        warn!(
                            destination = %destination,
                            file = %file,
                            error = %e,
                            "Load succeeded but ledger append failed; file may be reprocessed on the next run"
                        );
                    }
                    info!(
                        destination = %destination,
                        file = %file,
                        rows_loaded,
                        "Loaded file"
                    );
                    LoadOutcome::Success { rows_loaded }
                }
                Err(e) => {
                    warn!(
                        destination = %destination,
                        file = %file,
                        error = %e,
                        "Failed to load file"
                    );
                    LoadOutcome::Failure {
                        reason: e.to_string(),
                    }
                }
            };

            reports.push(FileReport {
                file: file.clone(),
                outcome,
            });
        }

        reports
    }
}
