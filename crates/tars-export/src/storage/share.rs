//! File share mounted as a local directory
//!
//! Uploads are written in fixed-size chunks to a temporary sibling and renamed
//! into place, so readers never observe a half-written result file.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use super::{ObjectStore, StoreError};

/// Default upload chunk size (4 MiB).
pub const DEFAULT_UPLOAD_CHUNK_BYTES: usize = 4 * 1024 * 1024;

const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug, Clone)]
pub struct LocalShare {
    root: PathBuf,
    name: String,
    chunk_size: usize,
}

impl LocalShare {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
            chunk_size: DEFAULT_UPLOAD_CHUNK_BYTES,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
            || name.ends_with(PARTIAL_SUFFIX);
        if invalid {
            return Err(StoreError::unavailable(
                &self.name,
                "resolve",
                std::io::Error::new(
                    ErrorKind::InvalidInput,
                    format!("invalid file name: {name:?}"),
                ),
            ));
        }
        Ok(self.root.join(name))
    }

    fn map_io(&self, operation: &'static str, name: &str, err: std::io::Error) -> StoreError {
        if err.kind() == ErrorKind::NotFound {
            StoreError::not_found(&self.name, name)
        } else {
            StoreError::unavailable(&self.name, operation, err)
        }
    }
}

#[async_trait]
impl ObjectStore for LocalShare {
    fn container(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(share = %self.name))]
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| StoreError::unavailable(&self.name, "list", e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::unavailable(&self.name, "list", e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.ends_with(PARTIAL_SUFFIX) {
                    names.push(name.to_string());
                }
            }
        }

        debug!(count = names.len(), "Listed share");
        Ok(names)
    }

    #[instrument(skip(self), fields(share = %self.name))]
    async fn download(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| self.map_io("download", name, e))
    }

    #[instrument(skip(self, data), fields(share = %self.name, bytes = data.len()))]
    async fn upload(&self, name: &str, data: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        let partial = self.root.join(format!("{name}{PARTIAL_SUFFIX}"));

        let mut file = tokio::fs::File::create(&partial)
            .await
            .map_err(|e| StoreError::unavailable(&self.name, "upload", e))?;

        for chunk in data.chunks(self.chunk_size) {
            file.write_all(chunk)
                .await
                .map_err(|e| StoreError::unavailable(&self.name, "upload", e))?;
        }
        file.flush()
            .await
            .map_err(|e| StoreError::unavailable(&self.name, "upload", e))?;
        drop(file);

        tokio::fs::rename(&partial, &path)
            .await
            .map_err(|e| StoreError::unavailable(&self.name, "upload", e))?;

        debug!(name, chunks = data.len().div_ceil(self.chunk_size), "Uploaded file");
        Ok(())
    }

    #[instrument(skip(self), fields(share = %self.name))]
    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| self.map_io("delete", name, e))
    }

    #[instrument(skip(self), fields(share = %self.name))]
    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.path_for(name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::unavailable(&self.name, "exists", e)),
        }
    }
}
