use std::sync::Arc;

use metrics::counter;
use tracing::{error, info, instrument};

use crate::constants::INPUT_PREFIX;
use crate::error::Result;
use crate::router::{FileRouter, RouteOutcome};
use crate::store::ObjectStorePort;
use crate::warehouse::WarehousePort;

/// Summary of one batch run.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub total_files: usize,
    pub published: usize,
    pub archived: usize,
    pub errors: Vec<String>,
}

/// Lists pending `input/` objects and routes each through the file router in
/// listing order, one at a time.
pub struct BatchDriver {
    store: Arc<dyn ObjectStorePort>,
    /// Warehouse handle held for the load path; not exercised by any stage yet.
    pub warehouse: Arc<dyn WarehousePort>,
    router: FileRouter,
}

impl BatchDriver {
    pub fn new(store: Arc<dyn ObjectStorePort>, warehouse: Arc<dyn WarehousePort>) -> Self {
        let router = FileRouter::new(store.clone());
        Self {
            store,
            warehouse,
            router,
        }
    }

    /// Process every pending input file sequentially. A failure on one file
    /// never stops the rest of the batch.
    #[instrument(skip(self))]
    pub async fn run_batch(&self) -> Result<BatchResult> {
        counter!("pipeline_batch_runs_total").increment(1);
        let files = self.store.list(INPUT_PREFIX).await?;

        let mut result = BatchResult {
            total_files: files.len(),
            ..Default::default()
        };

        if files.is_empty() {
            info!("🔎 no files to process under {}", INPUT_PREFIX);
            println!("🔎 no files to process under {INPUT_PREFIX}");
            return Ok(result);
        }

        for (i, file) in files.iter().enumerate() {
            info!("📂 processing file {}/{}: {}", i + 1, files.len(), file);
            println!("📂 processing file {}/{}: {}", i + 1, files.len(), file);
            match self.router.process(file).await {
                Ok(RouteOutcome::Published) => result.published += 1,
                Ok(RouteOutcome::Archived { reason }) => {
                    result.archived += 1;
                    result.errors.push(format!("{file}: {reason}"));
                }
                Err(e) => {
                    error!("failed to process {}: {}", file, e);
                    result.errors.push(format!("{file}: {e}"));
                }
            }
            println!();
        }

        info!(
            "✅ batch complete: {} published, {} archived of {}",
            result.published, result.archived, result.total_files
        );
        println!(
            "✅ batch complete: {} published, {} archived of {}",
            result.published, result.archived, result.total_files
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryObjectStore;
    use crate::warehouse::BigQueryWarehouse;

    const VALID_CSV: &[u8] =
        b"transaction_id,product_name,category,price,quantity,date,customer_name,customer_email\n\
          1,Widget,Tools,9.99,2,2024-03-01,Alice,alice@example.com\n";

    const MISSING_PRICE_CSV: &[u8] =
        b"transaction_id,product_name,category,quantity,date\n1,Widget,Tools,2,2024-03-01\n";

    fn driver_with(store: &Arc<InMemoryObjectStore>) -> BatchDriver {
        let warehouse: Arc<dyn WarehousePort> =
            Arc::new(BigQueryWarehouse::new("project", "dataset", "transactions"));
        BatchDriver::new(store.clone(), warehouse)
    }

    #[tokio::test]
    async fn empty_input_zone_writes_nothing() {
        let store = Arc::new(InMemoryObjectStore::new());
        let driver = driver_with(&store);

        let result = driver.run_batch().await.unwrap();

        assert_eq!(result.total_files, 0);
        assert_eq!(result.published, 0);
        assert_eq!(result.archived, 0);
        assert!(store.object_names().is_empty());
    }

    #[tokio::test]
    async fn failure_on_one_file_does_not_stop_the_batch() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put("input/bad.csv", MISSING_PRICE_CSV.to_vec());
        store.put("input/orders.csv", VALID_CSV.to_vec());
        let driver = driver_with(&store);

        let result = driver.run_batch().await.unwrap();

        assert_eq!(result.total_files, 2);
        assert_eq!(result.published, 1);
        assert_eq!(result.archived, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(store.get("error/bad.csv").is_some());
        assert!(store.get("done/orders.csv").is_some());
    }
}
