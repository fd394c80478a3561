use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use metrics::counter;
use tracing::{error, info, instrument, warn};

use crate::clean::clean;
use crate::constants::{basename, zone_path, CLEAN_PREFIX, DONE_PREFIX, ERROR_PREFIX};
use crate::error::{PipelineError, Result};
use crate::records::RecordSet;
use crate::store::{DeleteOutcome, ObjectStorePort, Payload};
use crate::validate::validate;

/// Terminal state of one routed file.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// Original bytes landed in `done/`; the cleaned copy was staged through
    /// `clean/` and dropped.
    Published,
    /// Original bytes landed in `error/`.
    Archived { reason: String },
}

/// Drives one file through fetch → parse → validate → clean → publish, with a
/// single failure boundary that archives the original to `error/`.
pub struct FileRouter {
    store: Arc<dyn ObjectStorePort>,
    scratch_dir: PathBuf,
}

impl FileRouter {
    pub fn new(store: Arc<dyn ObjectStorePort>) -> Self {
        Self::with_scratch_dir(store, std::env::temp_dir())
    }

    pub fn with_scratch_dir(store: Arc<dyn ObjectStorePort>, scratch_dir: PathBuf) -> Self {
        Self { store, scratch_dir }
    }

    /// Process a single `input/` object through to a terminal zone.
    ///
    /// Fetch failures propagate to the caller: with no local copy yet there
    /// is nothing to archive.
    #[instrument(skip(self))]
    pub async fn process(&self, object: &str) -> Result<RouteOutcome> {
        let scratch = self.scratch_dir.join(basename(object));
        self.store.download(object, &scratch).await?;
        let original = fs::read(&scratch)?;

        match self.run_stages(object, &original).await {
            Ok(()) => {
                info!("✅ {} processed and moved to {} and {}", object, CLEAN_PREFIX, DONE_PREFIX);
                println!("✅ {object} processed and moved to {CLEAN_PREFIX} and {DONE_PREFIX}");
                counter!("pipeline_files_published_total").increment(1);
                Ok(RouteOutcome::Published)
            }
            Err(e) => {
                let dest = zone_path(ERROR_PREFIX, basename(object));
                error!("❌ processing {} failed: {}; archiving to {}", object, e, dest);
                println!("❌ processing {object} failed, moved to {ERROR_PREFIX}: {e}");
                self.store
                    .upload(&dest, Payload::Binary(original))
                    .await?;
                counter!("pipeline_files_archived_total").increment(1);
                Ok(RouteOutcome::Archived {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Everything inside the per-file failure boundary. Any error here sends
    /// the original bytes to `error/`.
    async fn run_stages(&self, object: &str, original: &[u8]) -> Result<()> {
        let records = RecordSet::from_csv(original)?;
        info!("parsed {} rows from {}", records.rows.len(), object);

        if !validate(&records) {
            return Err(PipelineError::Validation(format!(
                "required columns absent, null or not coercible in {object}"
            )));
        }

        let cleaned = clean(&records)?;
        let name = basename(object);

        // Transient staging artifact: written to prove the cleaning step ran,
        // then dropped. The delete is best-effort and never blocks publish.
        let staging = zone_path(CLEAN_PREFIX, name);
        self.store
            .upload(&staging, Payload::Text(cleaned.to_csv()?))
            .await?;
        match self.store.delete(&staging).await {
            DeleteOutcome::Deleted => {}
            DeleteOutcome::Missing => warn!("transient artifact {} was already gone", staging),
            DeleteOutcome::Failed(message) => {
                warn!("could not delete transient artifact {}: {}", staging, message)
            }
        }

        // The durable success artifact is the original file as received.
        self.store
            .upload(&zone_path(DONE_PREFIX, name), Payload::Binary(original.to_vec()))
            .await?;
        Ok(())
    }
}
