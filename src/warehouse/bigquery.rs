//! BigQuery implementations of the warehouse capabilities.
//!
//! Talks to the BigQuery REST v2 API: load jobs for bulk CSV ingestion,
//! `tables` get/insert for idempotent metadata-table creation, `queries` for
//! ledger reads, and `tabledata.insertAll` for ledger appends.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use snafu::prelude::*;
use tracing::debug;

use crate::error::{HttpSnafu, InvalidResponseSnafu, WarehouseError};
use crate::ledger::LedgerEntry;
use crate::schema::{SemanticType, TableSchema};

use super::{BulkLoader, MetadataStore, TableId};

/// Default BigQuery REST endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// How often to poll a running load job for completion.
const JOB_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// BigQuery REST client implementing [`BulkLoader`] and [`MetadataStore`].
#[derive(Debug, Clone)]
pub struct BigQueryClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    poll_interval: Duration,
}

impl BigQueryClient {
    /// Create a client against the given endpoint with a bearer token.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
            poll_interval: JOB_POLL_INTERVAL,
        }
    }

    /// Override the job poll interval (tests use a short one).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn table_url(&self, table: &TableId) -> String {
        format!(
            "{}/projects/{}/datasets/{}/tables/{}",
            self.endpoint, table.project, table.dataset, table.table
        )
    }

    async fn get(&self, url: &str) -> Result<Response, WarehouseError> {
        self.http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context(HttpSnafu)
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Response, WarehouseError> {
        self.http
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .context(HttpSnafu)
    }

    /// Wait for a load job to reach the DONE state and return its response.
    async fn wait_for_job(
        &self,
        project: &str,
        mut job: JobResponse,
    ) -> Result<JobResponse, WarehouseError> {
        loop {
            if job.status.as_ref().is_some_and(|s| s.state == "DONE") {
                return Ok(job);
            }

            let job_id = job
                .job_reference
                .as_ref()
                .map(|r| r.job_id.clone())
                .ok_or_else(|| WarehouseError::InvalidResponse {
                    message: "job response missing jobReference.jobId".to_string(),
                })?;

            tokio::time::sleep(self.poll_interval).await;

            let url = format!("{}/projects/{project}/jobs/{job_id}", self.endpoint);
            let response = check_status(self.get(&url).await?).await?;
            job = response.json().await.context(HttpSnafu)?;
        }
    }
}

#[async_trait]
impl BulkLoader for BigQueryClient {
    async fn load_csv(
        &self,
        source_uri: &str,
        destination: &TableId,
        schema: &TableSchema,
    ) -> Result<u64, WarehouseError> {
        let body = json!({
            "configuration": {
                "load": {
                    "sourceUris": [source_uri],
                    "destinationTable": table_reference(destination),
                    "schema": schema_fields(schema),
                    "sourceFormat": "CSV",
                    "skipLeadingRows": 1,
                    "writeDisposition": "WRITE_APPEND",
                }
            }
        });

        let url = format!("{}/projects/{}/jobs", self.endpoint, destination.project);
        let response = check_status(self.post(&url, &body).await?).await?;
        let job: JobResponse = response.json().await.context(HttpSnafu)?;

        let job = self.wait_for_job(&destination.project, job).await?;

        if let Some(error) = job.status.and_then(|s| s.error_result) {
            return Err(WarehouseError::JobFailed {
                reason: error.message,
            });
        }

        let rows_loaded = job
            .statistics
            .and_then(|s| s.load)
            .and_then(|l| l.output_rows)
            .and_then(|rows| rows.parse().ok())
            .unwrap_or(0);

        debug!(destination = %destination, rows_loaded, "Load job complete");
        Ok(rows_loaded)
    }
}

#[async_trait]
impl MetadataStore for BigQueryClient {
    async fn ensure_table(
        &self,
        table: &TableId,
        schema: &TableSchema,
    ) -> Result<(), WarehouseError> {
        let response = self.get(&self.table_url(table)).await?;
        match response.status() {
            status if status.is_success() => return Ok(()),
            StatusCode::NOT_FOUND => {}
            _ => {
                check_status(response).await?;
                return Ok(());
            }
        }

        let body = json!({
            "tableReference": table_reference(table),
            "schema": schema_fields(schema),
        });
        let url = format!(
            "{}/projects/{}/datasets/{}/tables",
            self.endpoint, table.project, table.dataset
        );
        let response = self.post(&url, &body).await?;

        // A concurrent creator winning the race is not an error
        if response.status() == StatusCode::CONFLICT {
            debug!(table = %table, "Metadata table already created concurrently");
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }

    async fn query_source_files(&self, table: &TableId) -> Result<Vec<String>, WarehouseError> {
        let body = json!({
            "query": format!("SELECT DISTINCT source_file FROM `{table}`"),
            "useLegacySql": false,
        });

        let url = format!("{}/projects/{}/queries", self.endpoint, table.project);
        let response = self.post(&url, &body).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(WarehouseError::TableNotFound {
                table: table.to_string(),
            });
        }
        let response = check_status(response).await?;
        let results: QueryResponse = response.json().await.context(HttpSnafu)?;

        ensure!(
            results.job_complete,
            InvalidResponseSnafu {
                message: "query did not complete within the request timeout",
            }
        );

        Ok(results
            .rows
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| row.f.into_iter().next().and_then(|cell| cell.v))
            .collect())
    }

    async fn insert_entries(
        &self,
        table: &TableId,
        entries: &[LedgerEntry],
    ) -> Result<(), WarehouseError> {
        let rows: Vec<Value> = entries
            .iter()
            .map(|entry| {
                json!({
                    "json": {
                        "source_file": entry.source_file,
                        "process_date": entry.process_date.to_rfc3339(),
                        "rows_loaded": entry.rows_loaded,
                    }
                })
            })
            .collect();

        let url = format!("{}/insertAll", self.table_url(table));
        let response = check_status(self.post(&url, &json!({ "rows": rows })).await?).await?;
        let result: InsertResponse = response.json().await.context(HttpSnafu)?;

        if let Some(errors) = result.insert_errors.filter(|e| !e.is_empty()) {
            return Err(WarehouseError::RowsRejected {
                message: format!("{} row(s) rejected: {:?}", errors.len(), errors),
            });
        }
        Ok(())
    }
}

/// Map an error response to `WarehouseError::Api`, passing successes through.
async fn check_status(response: Response) -> Result<Response, WarehouseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or(body);

    Err(WarehouseError::Api {
        status: status.as_u16(),
        message,
    })
}

fn table_reference(table: &TableId) -> Value {
    json!({
        "projectId": table.project,
        "datasetId": table.dataset,
        "tableId": table.table,
    })
}

fn schema_fields(schema: &TableSchema) -> Value {
    let fields: Vec<Value> = schema
        .fields
        .iter()
        .map(|f| json!({ "name": f.name, "type": semantic_type_name(f.field_type) }))
        .collect();
    json!({ "fields": fields })
}

/// BigQuery type name for a semantic column type.
fn semantic_type_name(field_type: SemanticType) -> &'static str {
    match field_type {
        SemanticType::Integer => "INTEGER",
        SemanticType::Float => "FLOAT",
        SemanticType::String => "STRING",
        SemanticType::Date => "DATE",
        SemanticType::Timestamp => "TIMESTAMP",
    }
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    #[serde(rename = "jobReference")]
    job_reference: Option<JobReference>,
    status: Option<JobStatus>,
    statistics: Option<JobStatistics>,
}

#[derive(Debug, Deserialize)]
struct JobReference {
    #[serde(rename = "jobId")]
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    state: String,
    #[serde(rename = "errorResult")]
    error_result: Option<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    message: String,
}

#[derive(Debug, Deserialize)]
struct JobStatistics {
    load: Option<LoadStatistics>,
}

#[derive(Debug, Deserialize)]
struct LoadStatistics {
    #[serde(rename = "outputRows")]
    output_rows: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(rename = "jobComplete", default)]
    job_complete: bool,
    rows: Option<Vec<QueryRow>>,
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    f: Vec<QueryCell>,
}

#[derive(Debug, Deserialize)]
struct QueryCell {
    v: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InsertResponse {
    #[serde(rename = "insertErrors")]
    insert_errors: Option<Vec<Value>>,
}
