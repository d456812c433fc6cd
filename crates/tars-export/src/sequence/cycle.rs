//! One complete export cycle
//!
//! Allocate sequence numbers, write the result file into the share, then
//! persist the metadata record describing it. Nothing is written when
//! allocation fails.

use serde::Serialize;
use tars_common::{BasicMetadataDraft, MetadataRecord};
use tracing::{info, instrument};

use super::SequenceAllocator;
use crate::error::ExportError;

/// Default template for result file names.
pub const DEFAULT_RESULT_FILE_TEMPLATE: &str = "TARS{sequence}.xml";

/// What a finished cycle wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOutcome {
    pub record: MetadataRecord,
    pub metadata_file: String,
}

/// Expand `{sequence}`, `{daily}` and `{date}` (`YYYYMMDD`) in a file name template
pub fn render_file_name(template: &str, draft: &BasicMetadataDraft) -> String {
    template
        .replace("{sequence}", &draft.sequence_number.to_string())
        .replace("{daily}", &draft.daily_sequence_number.to_string())
        .replace("{date}", &draft.created.format("%Y%m%d").to_string())
}

pub struct ExportCycle<'a> {
    allocator: &'a SequenceAllocator,
    file_name_template: String,
}

impl<'a> ExportCycle<'a> {
    pub fn new(allocator: &'a SequenceAllocator, file_name_template: impl Into<String>) -> Self {
        Self {
            allocator,
            file_name_template: file_name_template.into(),
        }
    }

    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn run(&self, content: Vec<u8>, number_of_rows: u64) -> Result<ExportOutcome, ExportError> {
        let draft = self.allocator.prepare_new_basic_metadata().await?;
        let file_name = render_file_name(&self.file_name_template, &draft);
        let record = MetadataRecord::from_draft(&draft, file_name.clone(), &content, number_of_rows);

        self.allocator
            .results()
            .upload(&file_name, content)
            .await
            .map_err(|source| ExportError::Upload {
                file_name: file_name.clone(),
                source,
            })?;

        let metadata_file = self.allocator.metadata().save(&record).await?;

        info!(
            file_name = %file_name,
            metadata_file = %metadata_file,
            sequence_number = record.sequence_number,
            daily_sequence_number = %record.daily_sequence_number,
            "Export cycle complete"
        );

        Ok(ExportOutcome {
            record,
            metadata_file,
        })
    }
}
