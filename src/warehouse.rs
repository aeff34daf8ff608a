//! Warehouse execution boundary.
//!
//! SQL execution is a single call to the warehouse's HTTP API; this module
//! only defines the seam and a thin BigQuery implementation behind it. No
//! retry or backoff here; that belongs to the caller if ever wanted.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Row = Map<String, Value>;

#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Executes a read-only SQL statement and returns the result rows as
    /// maps keyed by column name.
    async fn execute(&self, sql: &str) -> anyhow::Result<Vec<Row>>;
}

/// Full table reference in `project.dataset.table` form.
pub fn build_table_name(project_id: &str, dataset: &str, table: &str) -> String {
    format!("{project_id}.{dataset}.{table}")
}

/// BigQuery REST client (synchronous jobs.query endpoint).
pub struct BigQueryWarehouse {
    project_id: String,
    access_token: String,
    timeout_ms: u64,
    client: Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    timeout_ms: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
    #[serde(default)]
    job_complete: Option<bool>,
}

#[derive(Deserialize)]
struct TableSchema {
    fields: Vec<TableField>,
}

#[derive(Deserialize)]
struct TableField {
    name: String,
}

#[derive(Deserialize)]
struct TableRow {
    f: Vec<TableCell>,
}

#[derive(Deserialize)]
struct TableCell {
    #[serde(default)]
    v: Value,
}

impl BigQueryWarehouse {
    pub fn new(project_id: &str, access_token: &str, timeout_secs: u64) -> Self {
        Self {
            project_id: project_id.to_string(),
            access_token: access_token.to_string(),
            timeout_ms: timeout_secs * 1000,
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs.max(30)))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn query_url(&self) -> String {
        format!(
            "https://bigquery.googleapis.com/bigquery/v2/projects/{}/queries",
            self.project_id
        )
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn execute(&self, sql: &str) -> anyhow::Result<Vec<Row>> {
        let request = QueryRequest {
            query: sql,
            use_legacy_sql: false,
            timeout_ms: self.timeout_ms,
        };

        let response = self
            .client
            .post(self.query_url())
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("BigQuery returned {status}: {body}");
        }

        let parsed: QueryResponse = response.json().await?;
        if parsed.job_complete == Some(false) {
            anyhow::bail!("BigQuery job did not complete within the query timeout");
        }

        Ok(rows_to_maps(&parsed))
    }
}

fn rows_to_maps(response: &QueryResponse) -> Vec<Row> {
    let Some(schema) = response.schema.as_ref() else {
        return Vec::new();
    };

    response
        .rows
        .iter()
        .map(|row| {
            schema
                .fields
                .iter()
                .zip(row.f.iter())
                .map(|(field, cell)| (field.name.clone(), cell.v.clone()))
                .collect()
        })
        .collect()
}
