//! Retention pruning: keep the newest member of a family, delete the rest
//!
//! Names outside the family are never touched. Every deletion of a run is
//! issued concurrently and awaited; one failing deletion does not stop the
//! others and the run only reports once all of them have settled.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{DeletionFailure, PruneError};
use crate::naming::{dashless_lowercase, has_prefix_ignore_case, select_newest};
use crate::storage::ObjectStore;

pub mod housekeeping;

pub use housekeeping::{Housekeeping, HousekeepingReport};

/// Which names a pruner may consider and how recent each one is
pub trait RetentionRule: Send + Sync {
    type Key: Ord;

    /// Short label used in logs
    fn name(&self) -> &'static str;

    fn is_member(&self, name: &str) -> bool;

    fn recency_key(&self, name: &str) -> Self::Key;
}

/// Processed result files in the file share.
///
/// Members carry the processed prefix in any letter case; recency is the
/// name itself with dashes stripped, compared case-insensitively.
#[derive(Debug, Clone)]
pub struct ProcessedFileRule {
    prefix: String,
}

impl ProcessedFileRule {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl RetentionRule for ProcessedFileRule {
    type Key = String;

    fn name(&self) -> &'static str {
        "processed-files"
    }

    fn is_member(&self, name: &str) -> bool {
        has_prefix_ignore_case(name, &self.prefix)
    }

    fn recency_key(&self, name: &str) -> String {
        dashless_lowercase(name)
    }
}

/// Metadata blobs, ordered by plain string comparison of their names.
///
/// Without a suffix every blob in the container is a member.
#[derive(Debug, Clone, Default)]
pub struct MetadataBlobRule {
    suffix: Option<String>,
}

impl MetadataBlobRule {
    pub fn new(suffix: Option<String>) -> Self {
        Self { suffix }
    }
}

impl RetentionRule for MetadataBlobRule {
    type Key = String;

    fn name(&self) -> &'static str {
        "metadata-blobs"
    }

    fn is_member(&self, name: &str) -> bool {
        self.suffix
            .as_deref()
            .is_none_or(|suffix| name.ends_with(suffix))
    }

    fn recency_key(&self, name: &str) -> String {
        name.to_string()
    }
}

/// Result of a pruning run that had no failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PruneOutcome {
    /// The listing was empty
    CollectionEmpty,
    /// Names were listed but none belongs to the family
    NothingToDelete,
    /// `kept` survives; `deleted` may be empty when it was the only member
    Pruned { kept: String, deleted: Vec<String> },
}

impl PruneOutcome {
    pub fn deleted(&self) -> &[String] {
        match self {
            PruneOutcome::Pruned { deleted, .. } => deleted,
            _ => &[],
        }
    }
}

pub struct RetentionPruner<R> {
    store: Arc<dyn ObjectStore>,
    rule: R,
}

impl<R: RetentionRule> RetentionPruner<R> {
    pub fn new(store: Arc<dyn ObjectStore>, rule: R) -> Self {
        Self { store, rule }
    }

    #[instrument(skip(self), fields(container = %self.store.container(), rule = self.rule.name()))]
    pub async fn prune(&self) -> Result<PruneOutcome, PruneError> {
        let container = self.store.container().to_string();

        let names = self.store.list().await.map_err(|source| PruneError::List {
            container: container.clone(),
            source,
        })?;

        if names.is_empty() {
            info!("Collection empty, nothing to prune");
            return Ok(PruneOutcome::CollectionEmpty);
        }

        let members: Vec<&String> = names.iter().filter(|n| self.rule.is_member(n)).collect();
        let Some(kept) = select_newest(members.iter().copied(), |n| Some(self.rule.recency_key(n)))
        else {
            info!(listed = names.len(), "No family members, nothing to delete");
            return Ok(PruneOutcome::NothingToDelete);
        };

        let doomed: Vec<&str> = members
            .iter()
            .map(|n| n.as_str())
            .filter(|n| *n != kept)
            .collect();
        debug!(kept, doomed = doomed.len(), "Pruning superseded files");

        let results = join_all(doomed.iter().map(|name| async move {
            let result = self.store.delete(name).await;
            (*name, result)
        }))
        .await;

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for (name, result) in results {
            match result {
                Ok(()) => deleted.push(name.to_string()),
                Err(source) => {
                    warn!(name, error = %source, "Failed to delete superseded file");
                    failed.push(DeletionFailure {
                        name: name.to_string(),
                        source,
                    });
                },
            }
        }

        info!(kept, deleted = deleted.len(), failed = failed.len(), "Pruning finished");

        if failed.is_empty() {
            Ok(PruneOutcome::Pruned {
                kept: kept.to_string(),
                deleted,
            })
        } else {
            Err(PruneError::Deletions {
                container,
                kept: kept.to_string(),
                deleted,
                failed,
            })
        }
    }
}
