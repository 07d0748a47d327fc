//! Run summary types and reporting.

use tracing::{info, warn};

use crate::classify::Category;
use crate::loader::{FileReport, LoadOutcome};
use crate::warehouse::TableId;

/// Outcome of one category within a run.
#[derive(Debug)]
pub enum CategoryStatus {
    /// The listing contained no files for this category.
    NoneFound,
    /// Every candidate already had a ledger entry.
    AllProcessed,
    /// The loader was invoked; per-file outcomes in listing order.
    Loaded(Vec<FileReport>),
}

/// Per-category section of the run summary.
#[derive(Debug)]
pub struct CategoryReport {
    pub category: Category,
    pub destination: TableId,
    pub status: CategoryStatus,
}

impl CategoryReport {
    pub fn new(category: Category, destination: TableId, status: CategoryStatus) -> Self {
        Self {
            category,
            destination,
            status,
        }
    }
}

/// Aggregated result of one coordinator run.
#[derive(Debug)]
pub struct RunSummary {
    categories: Vec<CategoryReport>,
    discarded: usize,
}

impl RunSummary {
    pub fn new(discarded: usize) -> Self {
        Self {
            categories: Vec::new(),
            discarded,
        }
    }

    pub fn push(&mut self, report: CategoryReport) {
        self.categories.push(report);
    }

    /// Per-category reports, in processing order.
    pub fn categories(&self) -> &[CategoryReport] {
        &self.categories
    }

    /// Number of listed files that matched no classification rule.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Total files loaded successfully across all categories.
    pub fn files_loaded(&self) -> usize {
        self.file_reports()
            .filter(|r| r.outcome.is_success())
            .count()
    }

    /// Total rows loaded across all successful files.
    pub fn rows_loaded(&self) -> u64 {
        self.file_reports()
            .filter_map(|r| match r.outcome {
                LoadOutcome::Success { rows_loaded } => Some(rows_loaded),
                LoadOutcome::Failure { .. } => None,
            })
            .sum()
    }

    /// Files that failed to load, with their reasons.
    pub fn failures(&self) -> Vec<&FileReport> {
        self.file_reports()
            .filter(|r| !r.outcome.is_success())
            .collect()
    }

    fn file_reports(&self) -> impl Iterator<Item = &FileReport> {
        self.categories.iter().flat_map(|c| match &c.status {
            CategoryStatus::Loaded(reports) => reports.as_slice(),
            _ => &[],
        })
    }

    /// Log the summary at the end of a run.
    pub fn log(&self) {
        for report in &self.categories {
            match &report.status {
                CategoryStatus::NoneFound => {
                    info!(target = %report.category, "Summary: none found");
                }
                CategoryStatus::AllProcessed => {
                    info!(target = %report.category, "Summary: all already processed");
                }
                CategoryStatus::Loaded(reports) => {
                    let loaded = reports.iter().filter(|r| r.outcome.is_success()).count();
                    info!(
                        target = %report.category,
                        destination = %report.destination,
                        loaded,
                        failed = reports.len() - loaded,
                        "Summary: batch complete"
                    );
                }
            }
        }

        for failure in self.failures() {
            if let LoadOutcome::Failure { reason } = &failure.outcome {
                warn!(file = %failure.file, reason = %reason, "File failed to load");
            }
        }

        info!(
            files_loaded = self.files_loaded(),
            rows_loaded = self.rows_loaded(),
            failed = self.failures().len(),
            discarded = self.discarded,
            "Run complete"
        );
    }
}
