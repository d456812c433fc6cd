//! Sequence allocation
//!
//! Decides the global and daily sequence numbers of the next export. The
//! previous export only counts as confirmed when its result file is still in
//! the file share, under its own name or with the processed prefix, and its
//! content hashes to the checksum recorded in the metadata. An unconfirmed
//! export is retried under the same sequence number.
//!
//! | prior metadata                         | sequence | daily (same day / new day) |
//! |----------------------------------------|----------|----------------------------|
//! | none                                   | default  | default / default          |
//! | without result file                    | unchanged draft of the prior record |
//! | file found, checksum matches           | prior+1  | prior+1 / 001              |
//! | file found, checksum differs           | prior    | prior / 001                |
//! | neither file nor processed file found  | prior    | prior / 001                |

use std::sync::Arc;
use tars_common::types::same_local_day;
use tars_common::{checksum, BasicMetadataDraft, Clock, DailySequenceNumber, MetadataRecord};
use tracing::{debug, info, instrument, warn};

use crate::error::{AllocatorError, MetadataError};
use crate::metadata::MetadataStore;
use crate::storage::ObjectStore;

pub mod cycle;

pub use cycle::ExportCycle;

/// Values the allocator falls back to and the processed-file marker it probes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatorSettings {
    pub default_sequence_number: u64,
    pub default_daily_sequence_number: DailySequenceNumber,
    pub processed_prefix: String,
}

/// Where the result file of the prior record was found
#[derive(Debug, Clone, PartialEq, Eq)]
enum ResultFile {
    Original(String),
    Processed(String),
    Missing,
}

pub struct SequenceAllocator {
    metadata: MetadataStore,
    results: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
    settings: AllocatorSettings,
}

impl SequenceAllocator {
    pub fn new(
        metadata: MetadataStore,
        results: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
        settings: AllocatorSettings,
    ) -> Self {
        Self {
            metadata,
            results,
            clock,
            settings,
        }
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn results(&self) -> &Arc<dyn ObjectStore> {
        &self.results
    }

    /// Draft the sequence numbers of the next export
    #[instrument(skip(self), fields(container = %self.metadata.container()))]
    pub async fn prepare_new_basic_metadata(&self) -> Result<BasicMetadataDraft, AllocatorError> {
        let now = self.clock.now();

        let prior = match self.metadata.load_latest().await {
            Ok(record) => record,
            Err(MetadataError::NotFound { .. }) => {
                info!(
                    sequence_number = self.settings.default_sequence_number,
                    "No prior metadata, starting from defaults"
                );
                return Ok(BasicMetadataDraft {
                    sequence_number: self.settings.default_sequence_number,
                    daily_sequence_number: self.settings.default_daily_sequence_number,
                    created: now.fixed_offset(),
                });
            },
            Err(e) => {
                return Err(AllocatorError::Prepare {
                    context: "loading the latest metadata record".to_string(),
                    source: Box::new(e),
                })
            },
        };

        let Some(file_name) = prior.file_name.as_deref() else {
            debug!(
                sequence_number = prior.sequence_number,
                "Prior metadata has no result file, reusing it"
            );
            return Ok(prior.to_draft());
        };

        let location = self.locate_result_file(file_name).await?;
        debug!(?location, "Located result file of prior export");

        let confirmed = match location {
            ResultFile::Original(name) | ResultFile::Processed(name) => {
                self.verify_result_file(&prior, &name).await?
            },
            ResultFile::Missing => {
                warn!(file_name, "Result file of prior export not found, retrying it");
                false
            },
        };

        let same_day = same_local_day(&prior.created, &now);
        let draft = advance(&prior, confirmed, same_day, now.fixed_offset());

        info!(
            confirmed,
            same_day,
            prior_sequence_number = prior.sequence_number,
            sequence_number = draft.sequence_number,
            daily_sequence_number = %draft.daily_sequence_number,
            "Prepared new metadata"
        );
        Ok(draft)
    }

    async fn locate_result_file(&self, file_name: &str) -> Result<ResultFile, AllocatorError> {
        if self.result_exists(file_name).await? {
            return Ok(ResultFile::Original(file_name.to_string()));
        }

        let processed = format!("{}{}", self.settings.processed_prefix, file_name);
        if self.result_exists(&processed).await? {
            return Ok(ResultFile::Processed(processed));
        }

        Ok(ResultFile::Missing)
    }

    async fn result_exists(&self, name: &str) -> Result<bool, AllocatorError> {
        self.results
            .exists(name)
            .await
            .map_err(|e| AllocatorError::Prepare {
                context: format!("checking whether result file {name} exists"),
                source: Box::new(e),
            })
    }

    async fn verify_result_file(
        &self,
        prior: &MetadataRecord,
        name: &str,
    ) -> Result<bool, AllocatorError> {
        let content = self.results.download(name).await.map_err(|source| {
            AllocatorError::ResultFileDownload {
                file_name: name.to_string(),
                source,
            }
        })?;

        let expected = prior.checksum.as_deref().unwrap_or_default();
        let confirmed = checksum::matches(&content, expected);
        if !confirmed {
            warn!(
                file_name = name,
                expected,
                actual = %checksum::checksum(&content),
                "Result file checksum mismatch, retrying prior export"
            );
        }
        Ok(confirmed)
    }
}

/// Sequence arithmetic once the prior export is known to be confirmed or not
pub fn advance(
    prior: &MetadataRecord,
    confirmed: bool,
    same_day: bool,
    created: chrono::DateTime<chrono::FixedOffset>,
) -> BasicMetadataDraft {
    let (sequence_number, daily_sequence_number) = match (confirmed, same_day) {
        (true, true) => (prior.sequence_number + 1, prior.daily_sequence_number.next()),
        (true, false) => (prior.sequence_number + 1, DailySequenceNumber::FIRST),
        (false, true) => (prior.sequence_number, prior.daily_sequence_number),
        (false, false) => (prior.sequence_number, DailySequenceNumber::FIRST),
    };

    BasicMetadataDraft {
        sequence_number,
        daily_sequence_number,
        created,
    }
}
