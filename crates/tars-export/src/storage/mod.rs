//! Storage collaborators
//!
//! Result files live in a file share and metadata records in a blob
//! container. Both are reached through [`ObjectStore`], bound to a single
//! container at construction.

use async_trait::async_trait;

pub use crate::error::StoreError;

pub mod config;
pub mod memory;
pub mod s3;
pub mod share;

pub use memory::MemoryStore;
pub use s3::S3Store;
pub use share::LocalShare;

/// Primitive operations on one container of a store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Container (bucket, share) this client is bound to, for logs and errors
    fn container(&self) -> &str;

    /// Every current name in the container, in no particular order
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Full content of `name`; [`StoreError::NotFound`] when absent
    async fn download(&self, name: &str) -> Result<Vec<u8>, StoreError>;

    /// Create or replace `name`
    async fn upload(&self, name: &str, data: Vec<u8>) -> Result<(), StoreError>;

    async fn delete(&self, name: &str) -> Result<(), StoreError>;

    async fn exists(&self, name: &str) -> Result<bool, StoreError>;
}
