use serde::{Deserialize, Serialize};
use std::env;

/// Default region for S3-compatible blob storage.
pub const DEFAULT_BLOB_REGION: &str = "us-east-1";

/// Default container holding the metadata records.
pub const DEFAULT_BLOB_CONTAINER: &str = "tars-metadata";

/// Connection settings for the blob container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub region: String,
    pub container: String,
    /// Static credentials; the default AWS provider chain is used when unset
    pub access_key: Option<String>,
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
    pub path_style: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: DEFAULT_BLOB_REGION.to_string(),
            container: DEFAULT_BLOB_CONTAINER.to_string(),
            access_key: None,
            secret_key: None,
            path_style: false,
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            endpoint: env::var("TARS_BLOB_ENDPOINT").ok(),
            region: env::var("TARS_BLOB_REGION").unwrap_or_else(|_| DEFAULT_BLOB_REGION.to_string()),
            container: env::var("TARS_BLOB_CONTAINER")
                .unwrap_or_else(|_| DEFAULT_BLOB_CONTAINER.to_string()),
            access_key: env::var("TARS_BLOB_ACCESS_KEY")
                .or_else(|_| env::var("AWS_ACCESS_KEY_ID"))
                .ok(),
            secret_key: env::var("TARS_BLOB_SECRET_KEY")
                .or_else(|_| env::var("AWS_SECRET_ACCESS_KEY"))
                .ok(),
            path_style: env::var("TARS_BLOB_PATH_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn for_minio(endpoint: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            region: DEFAULT_BLOB_REGION.to_string(),
            container: container.into(),
            access_key: Some("minioadmin".to_string()),
            secret_key: Some("minioadmin".to_string()),
            path_style: true,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.container.trim().is_empty() {
            anyhow::bail!("TARS_BLOB_CONTAINER cannot be empty");
        }
        if self.access_key.is_some() != self.secret_key.is_some() {
            anyhow::bail!("Blob access key and secret key must be set together");
        }
        Ok(())
    }

    /// Static key pair, when both halves are configured
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key, &self.secret_key) {
            (Some(access), Some(secret)) => Some((access.as_str(), secret.as_str())),
            _ => None,
        }
    }
}
