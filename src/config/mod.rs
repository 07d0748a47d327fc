//! Configuration for the cargadero loader.
//!
//! Loaded once at startup from a YAML file with environment variable
//! interpolation; never re-read mid-run.

mod vars;

pub use vars::interpolate;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::classify::Category;
use crate::error::{
    ConfigError, EmptyDatasetSnafu, EmptyDestinationSnafu, EmptyProjectSnafu, EmptySourceUrlSnafu,
    ReadFileSnafu, YamlParseSnafu,
};
use crate::warehouse::TableId;

/// Warehouse connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Warehouse project identifier.
    pub project: String,
    /// Dataset holding the destination tables.
    pub dataset: String,
    /// REST endpoint (overridable for tests).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Bearer token for API authentication.
    #[serde(default)]
    pub token: String,
}

fn default_endpoint() -> String {
    crate::warehouse::DEFAULT_ENDPOINT.to_string()
}

/// Source object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Bucket URL (supports gs://, s3://, or a local directory).
    pub url: String,
    /// Key prefix to list under (e.g. "Distribuidor_001/").
    #[serde(default)]
    pub prefix: String,
    /// Storage options for the backend (credentials, region, etc.).
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

/// Destination table name for each category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationsConfig {
    pub sales: String,
    pub stock: String,
    pub customer: String,
}

/// Main configuration for cargadero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub warehouse: WarehouseConfig,
    pub source: SourceConfig,
    pub destinations: DestinationsConfig,
}

impl Config {
    /// Load configuration from a file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let contents = interpolate(contents).map_err(|errors| ConfigError::EnvInterpolation {
            message: errors.join("\n"),
        })?;

        let config: Config = serde_yaml::from_str(&contents).context(YamlParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(!self.warehouse.project.is_empty(), EmptyProjectSnafu);
        ensure!(!self.warehouse.dataset.is_empty(), EmptyDatasetSnafu);
        ensure!(!self.source.url.is_empty(), EmptySourceUrlSnafu);

        for category in Category::ALL {
            ensure!(
                !self.destination_table(category).is_empty(),
                EmptyDestinationSnafu {
                    category: category.as_str(),
                }
            );
        }
        Ok(())
    }

    fn destination_table(&self, category: Category) -> &str {
        match category {
            Category::Sales => &self.destinations.sales,
            Category::Stock => &self.destinations.stock,
            Category::Customer => &self.destinations.customer,
        }
    }

    /// The fully-qualified destination table for a category.
    pub fn destination(&self, category: Category) -> TableId {
        TableId::new(
            &self.warehouse.project,
            &self.warehouse.dataset,
            self.destination_table(category),
        )
    }
}
