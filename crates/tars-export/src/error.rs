//! Error types for sequence allocation and housekeeping
//!
//! Storage collaborators report failures as [`StoreError`], with a missing
//! object as its own variant so callers never inspect message strings.
//! Each layer above wraps the error it received and keeps it reachable
//! through [`std::error::Error::source`].

use thiserror::Error;

/// Boxed cause preserved by allocator-level errors
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a single storage primitive
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{name} not found in {container}")]
    NotFound { container: String, name: String },

    #[error("Store unavailable: {operation} failed on {container}")]
    Unavailable {
        container: String,
        operation: &'static str,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    pub fn not_found(container: impl Into<String>, name: impl Into<String>) -> Self {
        StoreError::NotFound {
            container: container.into(),
            name: name.into(),
        }
    }

    pub fn unavailable(
        container: impl Into<String>,
        operation: &'static str,
        source: impl Into<BoxError>,
    ) -> Self {
        StoreError::Unavailable {
            container: container.into(),
            operation,
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Failure to locate or load the current metadata record
#[derive(Error, Debug)]
pub enum MetadataError {
    /// No record of the family exists yet
    #[error("No metadata found in {container}")]
    NotFound { container: String },

    #[error("Malformed metadata in {file_name}: {reason}")]
    Malformed { file_name: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure of [`crate::sequence::SequenceAllocator::prepare_new_basic_metadata`]
#[derive(Error, Debug)]
pub enum AllocatorError {
    /// The result file existed but could not be fetched for checksum comparison
    #[error("Failed to download result file {file_name} for checksum verification")]
    ResultFileDownload {
        file_name: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to prepare new metadata: {context}")]
    Prepare {
        context: String,
        #[source]
        source: BoxError,
    },
}

/// Failure of a full export cycle
#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Allocate(#[from] AllocatorError),

    #[error("Failed to upload result file {file_name}")]
    Upload {
        file_name: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to persist metadata")]
    Persist(#[from] MetadataError),
}

/// A single deletion that did not go through
#[derive(Error, Debug)]
#[error("Failed to delete {name}")]
pub struct DeletionFailure {
    pub name: String,
    #[source]
    pub source: StoreError,
}

/// Failure of one retention pruning run
#[derive(Error, Debug)]
pub enum PruneError {
    #[error("Failed to list {container}")]
    List {
        container: String,
        #[source]
        source: StoreError,
    },

    /// Every deletion was attempted; `failed` holds the ones that did not succeed
    #[error("{} deletions failed in {container}", describe_deletions(.deleted, .failed))]
    Deletions {
        container: String,
        kept: String,
        deleted: Vec<String>,
        failed: Vec<DeletionFailure>,
    },
}

/// One or both housekeeping branches failed
#[derive(Error, Debug)]
pub enum HousekeepingError {
    #[error("Housekeeping failed: {}", describe_partial_failure(.file_share, .blobs))]
    PartialFailure {
        file_share: Option<PruneError>,
        blobs: Option<PruneError>,
    },
}

fn describe_deletions(deleted: &[String], failed: &[DeletionFailure]) -> String {
    format!("{} of {}", failed.len(), failed.len() + deleted.len())
}

fn describe_partial_failure(file_share: &Option<PruneError>, blobs: &Option<PruneError>) -> String {
    let mut parts = Vec::new();
    if let Some(err) = file_share {
        parts.push(format!("file share: {err}"));
    }
    if let Some(err) = blobs {
        parts.push(format!("blobs: {err}"));
    }
    parts.join("; ")
}
