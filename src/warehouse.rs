use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::records::{Cell, RecordSet};

/// Analytic-warehouse collaborator. Constructed and injected alongside the
/// object store for parity with the deployment environment; no pipeline stage
/// loads into it yet.
#[async_trait]
pub trait WarehousePort: Send + Sync {
    async fn load_rows(&self, records: &RecordSet) -> Result<()>;
}

/// BigQuery streaming-insert client over the REST API.
pub struct BigQueryWarehouse {
    client: reqwest::Client,
    project_id: String,
    dataset: String,
    table: String,
    token: Option<String>,
}

impl BigQueryWarehouse {
    pub fn new(
        project_id: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            project_id: project_id.into(),
            dataset: dataset.into(),
            table: table.into(),
            token: std::env::var("GCP_BEARER_TOKEN").ok(),
        }
    }
}

#[async_trait]
impl WarehousePort for BigQueryWarehouse {
    async fn load_rows(&self, records: &RecordSet) -> Result<()> {
        let url = format!(
            "https://bigquery.googleapis.com/bigquery/v2/projects/{}/datasets/{}/tables/{}/insertAll",
            self.project_id, self.dataset, self.table
        );
        let rows: Vec<serde_json::Value> = records
            .rows
            .iter()
            .map(|row| {
                let fields: serde_json::Map<String, serde_json::Value> = records
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().map(Cell::to_json))
                    .collect();
                serde_json::json!({ "json": fields })
            })
            .collect();

        let mut request = self.client.post(&url).json(&serde_json::json!({ "rows": rows }));
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        request.send().await?.error_for_status()?;
        info!(
            "loaded {} rows into {}.{}.{}",
            records.rows.len(),
            self.project_id,
            self.dataset,
            self.table
        );
        Ok(())
    }
}
