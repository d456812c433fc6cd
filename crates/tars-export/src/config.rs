//! Configuration management

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tars_common::DailySequenceNumber;

use crate::metadata::family::DEFAULT_SEQUENCED_SUFFIX;
use crate::metadata::MetadataFamily;
use crate::sequence::AllocatorSettings;
use crate::storage::config::StorageConfig;
use crate::storage::share::DEFAULT_UPLOAD_CHUNK_BYTES;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Sequence number used when no metadata exists yet.
pub const DEFAULT_SEQUENCE_NUMBER: u64 = 1_000_000;

/// Daily sequence number used when no metadata exists yet.
pub const DEFAULT_DAILY_SEQUENCE_NUMBER: u32 = 1;

/// Marker prepended to result files once the recipient has processed them.
pub const DEFAULT_PROCESSED_PREFIX: &str = "processed-";

/// Default directory backing the file share.
pub const DEFAULT_SHARE_ROOT: &str = "./tars-share";

/// Default file share name.
pub const DEFAULT_SHARE_NAME: &str = "tars-results";

/// Default housekeeping interval in seconds (daily).
pub const DEFAULT_HOUSEKEEPING_INTERVAL_SECS: u64 = 86_400;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub metadata: MetadataConfig,
    pub share: ShareConfig,
    pub housekeeping: HousekeepingConfig,
    pub storage: StorageConfig,
}

/// Metadata family and sequence defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    pub family: MetadataFamily,
    pub default_sequence_number: u64,
    pub default_daily_sequence_number: DailySequenceNumber,
}

/// File share holding the result files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareConfig {
    pub root: PathBuf,
    pub name: String,
    pub processed_prefix: String,
    pub upload_chunk_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HousekeepingConfig {
    pub interval_secs: u64,
    /// Only blobs ending in this suffix are pruned; every blob when unset
    pub blob_suffix: Option<String>,
}

impl Config {
    /// Load configuration from `.env`, the environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let family = match env::var("TARS_METADATA_FIXED_NAME") {
            Ok(file_name) => MetadataFamily::fixed(file_name),
            Err(_) => MetadataFamily::sequenced(
                env::var("TARS_METADATA_SUFFIX")
                    .unwrap_or_else(|_| DEFAULT_SEQUENCED_SUFFIX.to_string()),
            ),
        };

        let config = Config {
            metadata: MetadataConfig {
                family,
                default_sequence_number: parse_var("TARS_DEFAULT_SEQUENCE_NUMBER")?
                    .unwrap_or(DEFAULT_SEQUENCE_NUMBER),
                default_daily_sequence_number: parse_var("TARS_DEFAULT_DAILY_SEQUENCE_NUMBER")?
                    .unwrap_or(DailySequenceNumber::new(DEFAULT_DAILY_SEQUENCE_NUMBER)),
            },
            share: ShareConfig {
                root: env::var("TARS_SHARE_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_SHARE_ROOT)),
                name: env::var("TARS_SHARE_NAME").unwrap_or_else(|_| DEFAULT_SHARE_NAME.to_string()),
                processed_prefix: env::var("TARS_PROCESSED_PREFIX")
                    .unwrap_or_else(|_| DEFAULT_PROCESSED_PREFIX.to_string()),
                upload_chunk_bytes: parse_var("TARS_SHARE_UPLOAD_CHUNK_BYTES")?
                    .unwrap_or(DEFAULT_UPLOAD_CHUNK_BYTES),
            },
            housekeeping: HousekeepingConfig {
                interval_secs: parse_var("TARS_HOUSEKEEPING_INTERVAL_SECS")?
                    .unwrap_or(DEFAULT_HOUSEKEEPING_INTERVAL_SECS),
                blob_suffix: env::var("TARS_HOUSEKEEPING_BLOB_SUFFIX").ok(),
            },
            storage: StorageConfig::from_env().context("Invalid blob storage configuration")?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        match &self.metadata.family {
            MetadataFamily::Sequenced { suffix } if suffix.is_empty() => {
                anyhow::bail!("TARS_METADATA_SUFFIX cannot be empty");
            },
            MetadataFamily::Fixed { file_name } if file_name.trim().is_empty() => {
                anyhow::bail!("TARS_METADATA_FIXED_NAME cannot be empty");
            },
            _ => {},
        }

        if self.share.processed_prefix.is_empty() {
            anyhow::bail!("TARS_PROCESSED_PREFIX cannot be empty");
        }

        if self.share.upload_chunk_bytes == 0 {
            anyhow::bail!("TARS_SHARE_UPLOAD_CHUNK_BYTES must be greater than 0");
        }

        if self.housekeeping.interval_secs == 0 {
            anyhow::bail!("TARS_HOUSEKEEPING_INTERVAL_SECS must be greater than 0");
        }

        if self.housekeeping.blob_suffix.is_none() {
            tracing::debug!("No blob suffix configured - every blob in the container is pruned");
        }

        self.storage.validate()
    }

    pub fn allocator_settings(&self) -> AllocatorSettings {
        AllocatorSettings {
            default_sequence_number: self.metadata.default_sequence_number,
            default_daily_sequence_number: self.metadata.default_daily_sequence_number,
            processed_prefix: self.share.processed_prefix.clone(),
        }
    }

    pub fn housekeeping_interval(&self) -> Duration {
        Duration::from_secs(self.housekeeping.interval_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metadata: MetadataConfig {
                family: MetadataFamily::default(),
                default_sequence_number: DEFAULT_SEQUENCE_NUMBER,
                default_daily_sequence_number: DailySequenceNumber::new(DEFAULT_DAILY_SEQUENCE_NUMBER),
            },
            share: ShareConfig {
                root: PathBuf::from(DEFAULT_SHARE_ROOT),
                name: DEFAULT_SHARE_NAME.to_string(),
                processed_prefix: DEFAULT_PROCESSED_PREFIX.to_string(),
                upload_chunk_bytes: DEFAULT_UPLOAD_CHUNK_BYTES,
            },
            housekeeping: HousekeepingConfig {
                interval_secs: DEFAULT_HOUSEKEEPING_INTERVAL_SECS,
                blob_suffix: None,
            },
            storage: StorageConfig::default(),
        }
    }
}

/// Parse an optional variable, failing on a present but invalid value
fn parse_var<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid {key}={raw}: {e}")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "TARS_METADATA_FIXED_NAME",
        "TARS_METADATA_SUFFIX",
        "TARS_DEFAULT_SEQUENCE_NUMBER",
        "TARS_DEFAULT_DAILY_SEQUENCE_NUMBER",
        "TARS_SHARE_ROOT",
        "TARS_SHARE_NAME",
        "TARS_PROCESSED_PREFIX",
        "TARS_SHARE_UPLOAD_CHUNK_BYTES",
        "TARS_HOUSEKEEPING_INTERVAL_SECS",
        "TARS_HOUSEKEEPING_BLOB_SUFFIX",
        "TARS_BLOB_ENDPOINT",
        "TARS_BLOB_REGION",
        "TARS_BLOB_CONTAINER",
        "TARS_BLOB_ACCESS_KEY",
        "TARS_BLOB_SECRET_KEY",
        "TARS_BLOB_PATH_STYLE",
        "AWS_ACCESS_KEY_ID",
        "AWS_SECRET_ACCESS_KEY",
    ];

    fn clear() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.metadata.default_sequence_number, 1_000_000);
        assert_eq!(config.metadata.default_daily_sequence_number.to_string(), "001");
        assert_eq!(config.housekeeping_interval(), Duration::from_secs(86_400));
    }

    #[test]
    #[serial]
    fn test_load_defaults() {
        clear();
        let config = Config::load().unwrap();
        assert_eq!(config.metadata.family, MetadataFamily::default());
        assert_eq!(config.share.processed_prefix, "processed-");
        assert_eq!(config.share.upload_chunk_bytes, DEFAULT_UPLOAD_CHUNK_BYTES);
        assert_eq!(config.share.name, DEFAULT_SHARE_NAME);
        assert!(config.housekeeping.blob_suffix.is_none());
        assert_eq!(config.storage.container, "tars-metadata");
        assert!(config.storage.endpoint.is_none());
        assert!(config.storage.access_key.is_none());
        assert!(!config.storage.path_style);
    }

    #[test]
    #[serial]
    fn test_clear_resets_share_and_blob_settings() {
        clear();
        env::set_var("TARS_SHARE_NAME", "other-results");
        env::set_var("TARS_BLOB_ENDPOINT", "http://localhost:9000");
        env::set_var("TARS_BLOB_CONTAINER", "other-metadata");
        env::set_var("TARS_BLOB_PATH_STYLE", "true");
        env::set_var("AWS_ACCESS_KEY_ID", "key");
        env::set_var("AWS_SECRET_ACCESS_KEY", "secret");

        let overridden = Config::load().unwrap();
        clear();
        let reloaded = Config::load().unwrap();

        assert_eq!(overridden.share.name, "other-results");
        assert_eq!(overridden.storage.container, "other-metadata");
        assert_eq!(overridden.storage.access_key.as_deref(), Some("key"));
        assert_eq!(reloaded.share.name, DEFAULT_SHARE_NAME);
        assert_eq!(reloaded.storage.container, "tars-metadata");
        assert!(reloaded.storage.endpoint.is_none());
        assert!(reloaded.storage.access_key.is_none());
        assert!(!reloaded.storage.path_style);
    }

    #[test]
    #[serial]
    fn test_load_overrides() {
        clear();
        env::set_var("TARS_METADATA_FIXED_NAME", "dva-results.json");
        env::set_var("TARS_DEFAULT_SEQUENCE_NUMBER", "42");
        env::set_var("TARS_DEFAULT_DAILY_SEQUENCE_NUMBER", "007");
        env::set_var("TARS_HOUSEKEEPING_BLOB_SUFFIX", "-TARS.json");

        let config = Config::load().unwrap();
        clear();

        assert_eq!(config.metadata.family, MetadataFamily::fixed("dva-results.json"));
        assert_eq!(config.metadata.default_sequence_number, 42);
        assert_eq!(config.metadata.default_daily_sequence_number.value(), 7);
        assert_eq!(config.housekeeping.blob_suffix.as_deref(), Some("-TARS.json"));

        let settings = config.allocator_settings();
        assert_eq!(settings.default_sequence_number, 42);
        assert_eq!(settings.processed_prefix, "processed-");
    }

    #[test]
    #[serial]
    fn test_load_rejects_invalid_numbers() {
        clear();
        env::set_var("TARS_DEFAULT_SEQUENCE_NUMBER", "lots");
        let result = Config::load();
        clear();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.housekeeping.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_fixed_name() {
        let mut config = Config::default();
        config.metadata.family = MetadataFamily::fixed("  ");
        assert!(config.validate().is_err());
    }
}
