//! Metadata store
//!
//! Locates, loads and persists the single current [`MetadataRecord`] of a
//! [`MetadataFamily`] in a blob container.

use std::sync::Arc;
use tars_common::MetadataRecord;
use tracing::{debug, info, instrument};

use crate::error::MetadataError;
use crate::naming::select_newest;
use crate::storage::ObjectStore;

pub mod family;
pub mod schema;

pub use family::{MetadataFamily, RecordDetail};

/// Select the current record of `family` out of a container listing.
///
/// Returns `None` when no listed name belongs to the family. Two names with
/// the same numeric key (`"5-TARS.json"`, `"05-TARS.json"`) cannot both be
/// produced by this crate; should they appear, the one ordering last as a
/// string wins.
pub fn find_latest<'a>(names: &'a [String], family: &MetadataFamily) -> Option<&'a str> {
    select_newest(names, |name| family.key(name))
}

#[derive(Clone)]
pub struct MetadataStore {
    store: Arc<dyn ObjectStore>,
    family: MetadataFamily,
}

impl MetadataStore {
    pub fn new(store: Arc<dyn ObjectStore>, family: MetadataFamily) -> Self {
        Self { store, family }
    }

    pub fn family(&self) -> &MetadataFamily {
        &self.family
    }

    pub fn container(&self) -> &str {
        self.store.container()
    }

    fn not_found(&self) -> MetadataError {
        MetadataError::NotFound {
            container: self.store.container().to_string(),
        }
    }

    /// Name of the current record
    #[instrument(skip(self), fields(container = %self.store.container()))]
    pub async fn find_latest(&self) -> Result<String, MetadataError> {
        match &self.family {
            MetadataFamily::Sequenced { .. } => {
                let names = self.store.list().await?;
                if names.is_empty() {
                    debug!("Metadata container is empty");
                    return Err(self.not_found());
                }
                let latest = find_latest(&names, &self.family).ok_or_else(|| self.not_found())?;
                debug!(latest, candidates = names.len(), "Resolved latest metadata");
                Ok(latest.to_string())
            },
            MetadataFamily::Fixed { file_name } => {
                if self.store.exists(file_name).await? {
                    Ok(file_name.clone())
                } else {
                    Err(self.not_found())
                }
            },
        }
    }

    /// Load and validate one record
    #[instrument(skip(self), fields(container = %self.store.container()))]
    pub async fn download_and_parse(&self, file_name: &str) -> Result<MetadataRecord, MetadataError> {
        // A listed record that cannot be fetched is a store failure, not missing metadata
        let raw = self.store.download(file_name).await?;
        schema::parse_record(file_name, &raw, self.family.detail())
    }

    /// The current record of the family
    pub async fn load_latest(&self) -> Result<MetadataRecord, MetadataError> {
        let file_name = self.find_latest().await?;
        self.download_and_parse(&file_name).await
    }

    /// Persist `record` under the family's name for it, returning that name
    #[instrument(skip(self, record), fields(container = %self.store.container(), sequence_number = record.sequence_number))]
    pub async fn save(&self, record: &MetadataRecord) -> Result<String, MetadataError> {
        let file_name = self.family.file_name_for(record);
        let body = record.to_json().map_err(|e| MetadataError::Malformed {
            file_name: file_name.clone(),
            reason: e.to_string(),
        })?;

        self.store.upload(&file_name, body).await?;

        info!(file_name = %file_name, "Saved metadata record");
        Ok(file_name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn record_json(sequence_number: u64) -> Vec<u8> {
        json!({
            "sequenceNumber": sequence_number,
            "dailySequenceNumber": "002",
            "created": "2020-01-01T08:00:00Z",
            "fileName": format!("TARS{sequence_number}.xml"),
            "checksum": "098f6bcd4621d373cade4e832627b4f6",
            "numberOfRows": 3
        })
        .to_string()
        .into_bytes()
    }

    fn sequenced(store: Arc<MemoryStore>) -> MetadataStore {
        MetadataStore::new(store, MetadataFamily::default())
    }

    #[test]
    fn test_find_latest_in_listing() {
        let names: Vec<String> = ["9-TARS.json", "10-TARS.json", "dva.json", "11-DVA.json"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(find_latest(&names, &MetadataFamily::default()), Some("10-TARS.json"));
        assert_eq!(find_latest(&[], &MetadataFamily::default()), None);
    }

    #[tokio::test]
    async fn test_load_latest_picks_numeric_maximum() {
        let store = Arc::new(MemoryStore::with_objects(
            "metadata",
            [
                ("999-TARS.json", record_json(999)),
                ("1000-TARS.json", record_json(1000)),
                ("dva-results.json", b"{}".to_vec()),
            ],
        ));

        let record = sequenced(store).load_latest().await.unwrap();
        assert_eq!(record.sequence_number, 1000);
    }

    #[tokio::test]
    async fn test_empty_container_is_not_found() {
        let store = Arc::new(MemoryStore::new("metadata"));
        let err = sequenced(store).load_latest().await.unwrap_err();
        assert!(matches!(err, MetadataError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_foreign_names_only_is_not_found() {
        let store = Arc::new(MemoryStore::with_objects("metadata", [("dva-results.json", "{}")]));
        let err = sequenced(store).find_latest().await.unwrap_err();
        assert!(matches!(err, MetadataError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_failure_is_store_error() {
        let store = Arc::new(MemoryStore::new("metadata"));
        store.fail_list(true);
        let err = sequenced(store).load_latest().await.unwrap_err();
        assert!(matches!(err, MetadataError::Store(StoreError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_download_of_vanished_record_is_store_error() {
        let store = Arc::new(MemoryStore::new("metadata"));
        let err = sequenced(store).download_and_parse("1000500-TARS.json").await.unwrap_err();
        assert!(matches!(err, MetadataError::Store(ref e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn test_malformed_record_is_reported() {
        let store = Arc::new(MemoryStore::with_objects(
            "metadata",
            [("5-TARS.json", r#"{"sequenceNumber":"five"}"#)],
        ));
        let err = sequenced(store).load_latest().await.unwrap_err();
        assert!(matches!(err, MetadataError::Malformed { ref file_name, .. } if file_name == "5-TARS.json"));
    }

    #[tokio::test]
    async fn test_fixed_family_reads_its_own_file() {
        let store = Arc::new(MemoryStore::with_objects(
            "metadata",
            [
                ("dva-results.json", json!({"sequenceNumber": 7, "dailySequenceNumber": "001", "created": "2020-01-01T00:00:00Z"}).to_string()),
                ("8-TARS.json", String::from_utf8(record_json(8)).unwrap()),
            ],
        ));
        let metadata = MetadataStore::new(store.clone(), MetadataFamily::fixed("dva-results.json"));

        let record = metadata.load_latest().await.unwrap();
        assert_eq!(record.sequence_number, 7);

        let missing = MetadataStore::new(store, MetadataFamily::fixed("dva-other.json"));
        assert!(matches!(missing.load_latest().await.unwrap_err(), MetadataError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = Arc::new(MemoryStore::new("metadata"));
        let metadata = sequenced(store.clone());

        let raw = record_json(1000001);
        let record = schema::parse_record("x", &raw, RecordDetail::Full).unwrap();

        let name = metadata.save(&record).await.unwrap();
        assert_eq!(name, "1000001-TARS.json");
        assert_eq!(metadata.load_latest().await.unwrap(), record);
        assert_eq!(store.names(), vec!["1000001-TARS.json"]);
    }
}
