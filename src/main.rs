use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use txn_pipeline::config::Config;
use txn_pipeline::constants::{zone_path, INPUT_PREFIX};
use txn_pipeline::driver::BatchDriver;
use txn_pipeline::logging;
use txn_pipeline::store::{GcsObjectStore, ObjectStorePort, Payload};
use txn_pipeline::warehouse::{BigQueryWarehouse, WarehousePort};

#[derive(Parser)]
#[command(name = "txn_pipeline")]
#[command(about = "Transaction file pipeline: validates, cleans and routes bucket CSVs")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every pending file under input/
    Run,
    /// Upload a local CSV into the bucket (defaults to input/<basename>)
    Upload {
        /// Local file to upload
        path: PathBuf,
        /// Destination object name
        #[arg(long)]
        dest: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    let store: Arc<dyn ObjectStorePort> = Arc::new(GcsObjectStore::with_base_url(
        &config.storage.bucket,
        &config.storage.endpoint,
    ));
    let warehouse: Arc<dyn WarehousePort> = Arc::new(BigQueryWarehouse::new(
        &config.warehouse.project_id,
        &config.warehouse.dataset,
        &config.warehouse.table,
    ));

    match cli.command {
        Commands::Run => {
            println!("🔄 Running batch pipeline...");
            let driver = BatchDriver::new(store, warehouse);
            match driver.run_batch().await {
                Ok(result) => {
                    println!("\n📊 Batch results:");
                    println!("   Total files: {}", result.total_files);
                    println!("   Published: {}", result.published);
                    println!("   Archived: {}", result.archived);

                    if !result.errors.is_empty() {
                        println!("\n⚠️  Errors encountered:");
                        for e in &result.errors {
                            println!("   - {e}");
                        }
                    }
                }
                Err(e) => {
                    error!("Batch run failed: {}", e);
                    println!("❌ Batch run failed: {e}");
                }
            }
        }
        Commands::Upload { path, dest } => {
            let object = match dest {
                Some(dest) => dest,
                None => {
                    let base = path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .ok_or("invalid file name")?;
                    zone_path(INPUT_PREFIX, base)
                }
            };
            let bytes = std::fs::read(&path)?;
            store.upload(&object, Payload::Binary(bytes)).await?;
            info!("uploaded {} to {}", path.display(), object);
            println!("📤 {} uploaded to {}", path.display(), object);
        }
    }

    Ok(())
}
