//! Common types used across TARS

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::checksum;
use crate::error::{Result, TarsError};

// ============================================================================
// Daily Sequence Number
// ============================================================================

/// Per-calendar-day export counter.
///
/// Rendered zero-padded to three digits while below 100 (`"001"`, `"099"`)
/// and unpadded from there on (`"100"`, `"1000"`). The value never wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DailySequenceNumber(u32);

impl DailySequenceNumber {
    /// The value every calendar day starts from
    pub const FIRST: Self = Self(1);

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// The number following this one on the same day
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl Default for DailySequenceNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

impl std::fmt::Display for DailySequenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

impl std::str::FromStr for DailySequenceNumber {
    type Err = TarsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TarsError::InvalidDailySequence(s.to_string()));
        }
        s.parse::<u32>()
            .map(Self)
            .map_err(|_| TarsError::InvalidDailySequence(s.to_string()))
    }
}

impl Serialize for DailySequenceNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DailySequenceNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Metadata Records
// ============================================================================

/// Sequence numbers handed out at the start of an export cycle.
///
/// Callers persist it together with the file specific fields once the
/// export has been written, see [`MetadataRecord::from_draft`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicMetadataDraft {
    pub sequence_number: u64,
    pub daily_sequence_number: DailySequenceNumber,
    pub created: DateTime<FixedOffset>,
}

/// Persisted metadata describing one export cycle.
///
/// `file_name`, `checksum` and `number_of_rows` are absent for basic records
/// that only track sequence numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub sequence_number: u64,
    pub daily_sequence_number: DailySequenceNumber,
    pub created: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_rows: Option<u64>,
}

impl MetadataRecord {
    /// Complete a draft once its result file has been exported
    pub fn from_draft(
        draft: &BasicMetadataDraft,
        file_name: impl Into<String>,
        content: &[u8],
        number_of_rows: u64,
    ) -> Self {
        Self {
            sequence_number: draft.sequence_number,
            daily_sequence_number: draft.daily_sequence_number,
            created: draft.created,
            file_name: Some(file_name.into()),
            checksum: Some(checksum::checksum(content)),
            number_of_rows: Some(number_of_rows),
        }
    }

    /// A record carrying only the sequence numbers of a draft
    pub fn basic(draft: &BasicMetadataDraft) -> Self {
        Self {
            sequence_number: draft.sequence_number,
            daily_sequence_number: draft.daily_sequence_number,
            created: draft.created,
            file_name: None,
            checksum: None,
            number_of_rows: None,
        }
    }

    pub fn to_draft(&self) -> BasicMetadataDraft {
        BasicMetadataDraft {
            sequence_number: self.sequence_number,
            daily_sequence_number: self.daily_sequence_number,
            created: self.created,
        }
    }

    /// Encode as the JSON document stored in the metadata container
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

// ============================================================================
// Time
// ============================================================================

/// Source of "now" for sequence allocation
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock in process-local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock frozen at a single instant, for tests and replays
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Whether two instants fall on the same calendar day in process-local time
pub fn same_local_day(created: &DateTime<FixedOffset>, now: &DateTime<Local>) -> bool {
    created.with_timezone(&Local).date_naive() == now.date_naive()
}
