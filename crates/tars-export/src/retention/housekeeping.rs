//! Daily housekeeping
//!
//! Prunes processed result files in the file share and superseded metadata
//! blobs. The two branches run concurrently and neither one's failure stops
//! the other.

use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument};

use super::{MetadataBlobRule, ProcessedFileRule, PruneOutcome, RetentionPruner};
use crate::error::HousekeepingError;

/// Outcomes of both branches of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HousekeepingReport {
    pub file_share: PruneOutcome,
    pub blobs: PruneOutcome,
}

pub struct Housekeeping {
    file_share: RetentionPruner<ProcessedFileRule>,
    blobs: RetentionPruner<MetadataBlobRule>,
}

impl Housekeeping {
    pub fn new(
        file_share: RetentionPruner<ProcessedFileRule>,
        blobs: RetentionPruner<MetadataBlobRule>,
    ) -> Self {
        Self { file_share, blobs }
    }

    /// One housekeeping pass over both collections
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<HousekeepingReport, HousekeepingError> {
        let (file_share, blobs) = tokio::join!(self.file_share.prune(), self.blobs.prune());

        match (file_share, blobs) {
            (Ok(file_share), Ok(blobs)) => {
                info!(
                    file_share_deleted = file_share.deleted().len(),
                    blobs_deleted = blobs.deleted().len(),
                    "Housekeeping finished"
                );
                Ok(HousekeepingReport { file_share, blobs })
            },
            (file_share, blobs) => {
                let err = HousekeepingError::PartialFailure {
                    file_share: file_share.err(),
                    blobs: blobs.err(),
                };
                error!(error = %err, "Housekeeping finished with failures");
                Err(err)
            },
        }
    }

    /// Run a pass immediately, then once per `every`, until `shutdown` resolves.
    ///
    /// A failed pass is logged and the schedule continues.
    pub async fn run_periodically<S>(&self, every: Duration, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(interval_secs = every.as_secs(), "Housekeeping scheduler started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Housekeeping scheduler stopping");
                    break;
                },
                _ = ticker.tick() => {
                    // Failures are already logged by run()
                    let _ = self.run().await;
                },
            }
        }
    }
}
