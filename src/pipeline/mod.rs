//! The coordinator - one incremental ingestion pass.
//!
//! Lists source objects, partitions them by category, diffs each category
//! against the ledger, and hands the remainder to the loader. A single run
//! is one pass with no internal retry loop: re-running the whole process is
//! the retry mechanism, made safe by the ledger diff.

mod summary;

pub use summary::{CategoryReport, CategoryStatus, RunSummary};

use std::collections::HashSet;

use snafu::ResultExt;
use tracing::{info, warn};

use crate::classify::{Category, Classified};
use crate::config::Config;
use crate::error::{ListingSnafu, RunError};
use crate::ledger::Ledger;
use crate::loader::Loader;
use crate::storage::StorageRef;

/// Orchestrates one ingestion run over explicitly injected service handles.
pub struct Coordinator {
    storage: StorageRef,
    ledger: Ledger,
    loader: Loader,
    config: Config,
}

impl Coordinator {
    pub fn new(storage: StorageRef, ledger: Ledger, loader: Loader, config: Config) -> Self {
        Self {
            storage,
            ledger,
            loader,
            config,
        }
    }

    /// Run one ingestion pass and report per-category outcomes.
    ///
    /// Only a listing failure aborts the run; everything downstream is
    /// reported in the summary instead of propagated.
    pub async fn run(&self) -> Result<RunSummary, RunError> {
        let csv_files = self
            .storage
            .list_csv_files()
            .await
            .context(ListingSnafu)?;

        if csv_files.is_empty() {
            info!(
                url = %self.storage.canonical_url(),
                "No CSV files found under the configured prefix"
            );
        }

        let classified = Classified::partition(csv_files);
        if !classified.discarded().is_empty() {
            info!(
                discarded = classified.discarded().len(),
                "Discarded unclassified files"
            );
        }

        let mut summary = RunSummary::new(classified.discarded().len());

        // Fixed category order for deterministic runs
        for category in Category::ALL {
            let report = self.process_category(category, &classified).await;
            summary.push(report);
        }

        Ok(summary)
    }

    /// Process one category: diff candidates against the ledger and load
    /// whatever remains.
    async fn process_category(
        &self,
        category: Category,
        classified: &Classified,
    ) -> CategoryReport {
        let destination = self.config.destination(category);
        let candidates = classified.files(category);

        if candidates.is_empty() {
            info!(target = %category, "No files found");
            return CategoryReport::new(category, destination, CategoryStatus::NoneFound);
        }

        let already_loaded = match self.ledger.already_loaded(&destination).await {
            Ok(loaded) => loaded,
            Err(e) => {
                // Conservative degrade: treating an unreachable ledger as
                // empty risks reprocessing, never skipping new data. Loads
                // are append-only, so duplicates are the worst case.
                warn!(
                    target = %category,
                    destination = %destination,
                    error = %e,
                    "Ledger query failed; treating all candidates as new"
                );
                HashSet::new()
            }
        };

        let new_files: Vec<String> = candidates
            .iter()
            .filter(|f| !already_loaded.contains(*f))
            .cloned()
            .collect();

        if new_files.is_empty() {
            info!(
                target = %category,
                destination = %destination,
                "All files already processed"
            );
            return CategoryReport::new(category, destination, CategoryStatus::AllProcessed);
        }

        let reports = self
            .loader
            .load(&new_files, &destination, category.schema())
            .await;

        CategoryReport::new(category, destination, CategoryStatus::Loaded(reports))
    }
}
