//! Metadata families
//!
//! Several families can share one container. Each family only ever reads,
//! selects and writes names that follow its own convention.

use serde::{Deserialize, Serialize};
use tars_common::MetadataRecord;

use crate::naming::sequence_key;

/// Default suffix of sequenced metadata names.
pub const DEFAULT_SEQUENCED_SUFFIX: &str = "-TARS.json";

/// Fields a family requires its records to carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordDetail {
    /// Sequence numbers and creation time only
    Basic,
    /// Also `fileName`, `checksum` and `numberOfRows`
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetadataFamily {
    /// `{sequenceNumber}{suffix}`; the current record has the largest prefix
    Sequenced { suffix: String },
    /// One constant name per category, overwritten each cycle
    Fixed { file_name: String },
}

impl Default for MetadataFamily {
    fn default() -> Self {
        MetadataFamily::Sequenced {
            suffix: DEFAULT_SEQUENCED_SUFFIX.to_string(),
        }
    }
}

impl MetadataFamily {
    pub fn sequenced(suffix: impl Into<String>) -> Self {
        MetadataFamily::Sequenced {
            suffix: suffix.into(),
        }
    }

    pub fn fixed(file_name: impl Into<String>) -> Self {
        MetadataFamily::Fixed {
            file_name: file_name.into(),
        }
    }

    pub fn detail(&self) -> RecordDetail {
        match self {
            MetadataFamily::Sequenced { .. } => RecordDetail::Full,
            MetadataFamily::Fixed { .. } => RecordDetail::Basic,
        }
    }

    /// Recency key of `name`, `None` when the family does not own it
    pub fn key(&self, name: &str) -> Option<u64> {
        match self {
            MetadataFamily::Sequenced { suffix } => {
                if !name.ends_with(suffix.as_str()) {
                    return None;
                }
                sequence_key(name)
            },
            MetadataFamily::Fixed { file_name } => (name == file_name).then_some(0),
        }
    }

    pub fn owns(&self, name: &str) -> bool {
        self.key(name).is_some()
    }

    /// Name under which `record` is persisted
    pub fn file_name_for(&self, record: &MetadataRecord) -> String {
        match self {
            MetadataFamily::Sequenced { suffix } => format!("{}{}", record.sequence_number, suffix),
            MetadataFamily::Fixed { file_name } => file_name.clone(),
        }
    }
}
