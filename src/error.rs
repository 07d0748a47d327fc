//! Error types for the cargadero loader.

use snafu::prelude::*;

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file: {source}"))]
    ReadFile { source: std::io::Error },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Warehouse project identifier is empty.
    #[snafu(display("Warehouse project cannot be empty"))]
    EmptyProject,

    /// Warehouse dataset identifier is empty.
    #[snafu(display("Warehouse dataset cannot be empty"))]
    EmptyDataset,

    /// Source bucket URL is empty.
    #[snafu(display("Source bucket URL cannot be empty"))]
    EmptySourceUrl,

    /// A category is configured with an empty destination table.
    #[snafu(display("Category '{category}' has an empty destination table"))]
    EmptyDestination { category: String },
}

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed: {source}"))]
    ObjectStore { source: object_store::Error },

    /// GCS configuration error.
    #[snafu(display("GCS configuration error: {source}"))]
    GcsConfig { source: object_store::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error: {source}"))]
    S3Config { source: object_store::Error },

    /// Local filesystem configuration error.
    #[snafu(display("Local storage configuration error: {source}"))]
    LocalConfig { source: object_store::Error },
}

/// Errors reported by the warehouse (bulk-load engine and metadata store).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WarehouseError {
    /// HTTP transport failure.
    #[snafu(display("Warehouse request failed: {source}"))]
    Http { source: reqwest::Error },

    /// The warehouse API returned an error status.
    #[snafu(display("Warehouse API error (status {status}): {message}"))]
    Api { status: u16, message: String },

    /// The queried table does not exist.
    ///
    /// Distinct from a transport or server failure so callers can treat
    /// "no metadata yet" differently from "metadata unreachable".
    #[snafu(display("Table not found: {table}"))]
    TableNotFound { table: String },

    /// A load job completed with an error result.
    #[snafu(display("Load job failed: {reason}"))]
    JobFailed { reason: String },

    /// The API response was missing an expected field.
    #[snafu(display("Unexpected warehouse response: {message}"))]
    InvalidResponse { message: String },

    /// Streaming insert was rejected for one or more rows.
    #[snafu(display("Warehouse rejected inserted rows: {message}"))]
    RowsRejected { message: String },
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LedgerError {
    /// Failed to query already-loaded files.
    #[snafu(display("Failed to query ledger: {source}"))]
    Query { source: WarehouseError },

    /// Failed to create the ledger metadata table.
    #[snafu(display("Failed to create ledger table: {source}"))]
    CreateTable { source: WarehouseError },

    /// Failed to append a ledger entry.
    #[snafu(display("Failed to append ledger entry: {source}"))]
    Append { source: WarehouseError },
}

/// Top-level run errors.
///
/// Only enumeration and startup failures propagate to this level; per-file
/// load errors are reported in the run summary instead.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RunError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Failed to enumerate source objects.
    #[snafu(display("Failed to list source objects: {source}"))]
    Listing { source: StorageError },
}

impl From<ConfigError> for RunError {
    fn from(source: ConfigError) -> Self {
        RunError::Config { source }
    }
}
