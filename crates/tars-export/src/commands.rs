//! `tars` command implementations
//!
//! Each command returns what it produced; the binary prints it as JSON.

use anyhow::Context;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tars_common::logging::{LogConfig, LogLevel, LogOutput};
use tars_common::{BasicMetadataDraft, Clock, MetadataRecord, SystemClock};
use tracing::info;

use crate::config::Config;
use crate::metadata::MetadataStore;
use crate::retention::{Housekeeping, HousekeepingReport, MetadataBlobRule, ProcessedFileRule, RetentionPruner};
use crate::sequence::cycle::ExportOutcome;
use crate::sequence::{ExportCycle, SequenceAllocator};
use crate::storage::{LocalShare, ObjectStore, S3Store};

/// Wired collaborators shared by every command
pub struct App {
    config: Config,
    share: Arc<dyn ObjectStore>,
    blobs: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
}

impl App {
    /// Connect to the configured file share and blob container
    pub async fn connect(config: Config) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.share.root)
            .await
            .with_context(|| format!("Failed to create share root {}", config.share.root.display()))?;

        let share = LocalShare::new(config.share.root.clone(), config.share.name.clone())
            .with_chunk_size(config.share.upload_chunk_bytes);
        let blobs = S3Store::new(config.storage.clone())
            .await
            .context("Failed to connect to blob storage")?;

        Ok(Self::from_stores(config, Arc::new(share), Arc::new(blobs), Arc::new(SystemClock)))
    }

    pub fn from_stores(
        config: Config,
        share: Arc<dyn ObjectStore>,
        blobs: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            share,
            blobs,
            clock,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metadata(&self) -> MetadataStore {
        MetadataStore::new(self.blobs.clone(), self.config.metadata.family.clone())
    }

    pub fn allocator(&self) -> SequenceAllocator {
        SequenceAllocator::new(
            self.metadata(),
            self.share.clone(),
            self.clock.clone(),
            self.config.allocator_settings(),
        )
    }

    pub fn housekeeping(&self) -> Housekeeping {
        Housekeeping::new(
            RetentionPruner::new(
                self.share.clone(),
                ProcessedFileRule::new(self.config.share.processed_prefix.clone()),
            ),
            RetentionPruner::new(
                self.blobs.clone(),
                MetadataBlobRule::new(self.config.housekeeping.blob_suffix.clone()),
            ),
        )
    }
}

/// `tars latest`
pub async fn latest(app: &App) -> anyhow::Result<MetadataRecord> {
    let record = app
        .metadata()
        .load_latest()
        .await
        .context("Failed to load the latest metadata record")?;
    Ok(record)
}

/// `tars allocate`
pub async fn allocate(app: &App) -> anyhow::Result<BasicMetadataDraft> {
    let draft = app.allocator().prepare_new_basic_metadata().await?;
    Ok(draft)
}

/// Logging setup for the binary: `-v` picks the level, `TARS_LOG_*` overrides it
///
/// An invalid logging environment is reported and ignored so the `-v` level
/// still applies.
pub fn log_config(verbose: bool) -> LogConfig {
    let built = LogConfig::builder()
        .level(if verbose { LogLevel::Debug } else { LogLevel::Warn })
        .output(LogOutput::Console)
        .log_file_prefix("tars")
        .build();

    match built.clone().merge_env() {
        Ok(merged) => merged,
        Err(e) => {
            eprintln!("Ignoring invalid logging environment: {e}");
            built
        },
    }
}

/// `tars export`
pub async fn export(
    app: &App,
    input: &Path,
    file_name_template: &str,
    number_of_rows: u64,
) -> anyhow::Result<ExportOutcome> {
    let content = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let allocator = app.allocator();
    let outcome = ExportCycle::new(&allocator, file_name_template)
        .run(content, number_of_rows)
        .await?;
    Ok(outcome)
}

/// `tars housekeeping` without `--every`
pub async fn housekeeping(app: &App) -> anyhow::Result<HousekeepingReport> {
    let report = app.housekeeping().run().await?;
    Ok(report)
}

/// `tars housekeeping --every`; `every_secs == 0` uses the configured interval
pub async fn housekeeping_schedule<S>(app: &App, every_secs: u64, shutdown: S) -> anyhow::Result<()>
where
    S: Future<Output = ()>,
{
    let every = if every_secs == 0 {
        app.config().housekeeping_interval()
    } else {
        std::time::Duration::from_secs(every_secs)
    };

    app.housekeeping().run_periodically(every, shutdown).await;
    info!("Housekeeping schedule stopped");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::{Local, TimeZone};
    use serial_test::serial;
    use tars_common::FixedClock;

    fn app(share: Arc<MemoryStore>, blobs: Arc<MemoryStore>) -> App {
        let now = Local.with_ymd_and_hms(2020, 8, 1, 12, 0, 0).unwrap();
        App::from_stores(Config::default(), share, blobs, Arc::new(FixedClock(now)))
    }

    #[tokio::test]
    async fn test_export_then_latest() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("export.xml");
        tokio::fs::write(&input, b"test").await.unwrap();

        let share = Arc::new(MemoryStore::new("results"));
        let blobs = Arc::new(MemoryStore::new("metadata"));
        let app = app(share.clone(), blobs.clone());

        let outcome = export(&app, &input, "TARS{sequence}.xml", 4).await.unwrap();
        assert_eq!(outcome.metadata_file, "1000000-TARS.json");
        assert_eq!(share.get("TARS1000000.xml").unwrap(), b"test");

        let record = latest(&app).await.unwrap();
        assert_eq!(record, outcome.record);
        assert_eq!(record.checksum.as_deref(), Some("098f6bcd4621d373cade4e832627b4f6"));
    }

    #[tokio::test]
    async fn test_latest_without_metadata_fails() {
        let app = app(Arc::new(MemoryStore::new("results")), Arc::new(MemoryStore::new("metadata")));
        assert!(latest(&app).await.is_err());
    }

    #[tokio::test]
    async fn test_allocate_defaults() {
        let app = app(Arc::new(MemoryStore::new("results")), Arc::new(MemoryStore::new("metadata")));
        let draft = allocate(&app).await.unwrap();
        assert_eq!(draft.sequence_number, 1_000_000);
        assert_eq!(draft.daily_sequence_number.to_string(), "001");
    }

    #[test]
    #[serial]
    fn test_log_config_invalid_env_keeps_verbose_level() {
        std::env::set_var("TARS_LOG_LEVEL", "chatty");
        let verbose = log_config(true);
        let quiet = log_config(false);
        std::env::remove_var("TARS_LOG_LEVEL");

        assert_eq!(verbose.level, LogLevel::Debug);
        assert_eq!(quiet.level, LogLevel::Warn);
        assert_eq!(verbose.log_file_prefix, "tars");
    }

    #[test]
    #[serial]
    fn test_log_config_env_overrides_flag() {
        std::env::set_var("TARS_LOG_LEVEL", "error");
        let config = log_config(true);
        std::env::remove_var("TARS_LOG_LEVEL");

        assert_eq!(config.level, LogLevel::Error);
    }
}
