//! Cargadero CLI: incremental CSV loader from object storage to BigQuery.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use cargadero::{
    init_tracing, BigQueryClient, Config, Coordinator, Ledger, Loader, Storage,
};

/// Incremental CSV loader from object storage into a warehouse.
#[derive(Debug, Parser)]
#[command(name = "cargadero", version)]
struct CliArgs {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    let config = match Config::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let storage = match Storage::for_url(
        &config.source.url,
        &config.source.prefix,
        &config.source.storage_options,
    ) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Failed to construct storage provider: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        source = %config.source.url,
        prefix = %config.source.prefix,
        project = %config.warehouse.project,
        dataset = %config.warehouse.dataset,
        "Starting cargadero run"
    );

    let client = Arc::new(BigQueryClient::new(
        &config.warehouse.endpoint,
        &config.warehouse.token,
    ));
    let ledger = Ledger::new(client.clone());
    // Listed keys are bucket-relative, so URIs are built against the bucket
    // root rather than the configured prefix.
    let loader = Loader::new(client, ledger.clone(), storage.canonical_url());
    let coordinator = Coordinator::new(storage, ledger, loader, config);

    // Individual load failures are reported in the summary and logged;
    // only a listing failure makes the run itself fail.
    match coordinator.run().await {
        Ok(summary) => {
            summary.log();
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Run failed: {e}");
            ExitCode::FAILURE
        }
    }
}
