//! Test helpers for tars-export integration tests
//!
//! Builds allocators and housekeeping runs over in-memory stores with a
//! clock pinned to a chosen local time.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use serde_json::json;
use std::sync::Arc;
use tars_common::{DailySequenceNumber, FixedClock};
use tars_export::retention::{MetadataBlobRule, ProcessedFileRule};
use tars_export::storage::MemoryStore;
use tars_export::{
    AllocatorSettings, Housekeeping, MetadataFamily, MetadataStore, ObjectStore, RetentionPruner,
    SequenceAllocator, StoreError,
};

/// md5("test")
pub const TEST_CHECKSUM: &str = "098f6bcd4621d373cade4e832627b4f6";

pub fn local(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

pub fn settings() -> AllocatorSettings {
    AllocatorSettings {
        default_sequence_number: 1_000_000,
        default_daily_sequence_number: DailySequenceNumber::FIRST,
        processed_prefix: "processed-".to_string(),
    }
}

/// Serialized metadata record with `created` at the given local time
pub fn record_json(
    sequence_number: u64,
    daily: &str,
    created: DateTime<Local>,
    file_name: &str,
    checksum: &str,
) -> Vec<u8> {
    json!({
        "sequenceNumber": sequence_number,
        "dailySequenceNumber": daily,
        "created": created.to_rfc3339(),
        "fileName": file_name,
        "checksum": checksum,
        "numberOfRows": 1
    })
    .to_string()
    .into_bytes()
}

/// Stores and clock behind one allocator
pub struct Fixture {
    pub share: Arc<MemoryStore>,
    pub blobs: Arc<MemoryStore>,
    pub now: DateTime<Local>,
}

impl Fixture {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            share: Arc::new(MemoryStore::new("results")),
            blobs: Arc::new(MemoryStore::new("metadata")),
            now,
        }
    }

    pub fn metadata(&self, family: MetadataFamily) -> MetadataStore {
        MetadataStore::new(self.blobs.clone(), family)
    }

    pub fn allocator(&self) -> SequenceAllocator {
        self.allocator_for(MetadataFamily::default())
    }

    pub fn allocator_for(&self, family: MetadataFamily) -> SequenceAllocator {
        self.allocator_over(self.blobs.clone(), family)
    }

    /// Allocator reading metadata from `blobs` instead of the fixture's store
    pub fn allocator_over(&self, blobs: Arc<dyn ObjectStore>, family: MetadataFamily) -> SequenceAllocator {
        SequenceAllocator::new(
            MetadataStore::new(blobs, family),
            self.share.clone(),
            Arc::new(FixedClock(self.now)),
            settings(),
        )
    }

    pub fn housekeeping(&self) -> Housekeeping {
        Housekeeping::new(
            RetentionPruner::new(self.share.clone(), ProcessedFileRule::new("processed-")),
            RetentionPruner::new(self.blobs.clone(), MetadataBlobRule::default()),
        )
    }
}

/// Store whose listing also reports names it no longer holds
pub struct StaleListing {
    inner: Arc<MemoryStore>,
    extra: Vec<String>,
}

impl StaleListing {
    pub fn new(inner: Arc<MemoryStore>, extra: &[&str]) -> Self {
        Self {
            inner,
            extra: extra.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl ObjectStore for StaleListing {
    fn container(&self) -> &str {
        self.inner.container()
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = self.inner.list().await?;
        names.extend(self.extra.iter().cloned());
        Ok(names)
    }

    async fn download(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        self.inner.download(name).await
    }

    async fn upload(&self, name: &str, data: Vec<u8>) -> Result<(), StoreError> {
        self.inner.upload(name, data).await
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.inner.delete(name).await
    }

    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        self.inner.exists(name).await
    }
}
