//! Blob container backed by S3-compatible object storage

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region},
    primitives::ByteStream,
    Client,
};
use tracing::{debug, info, instrument};

use super::{config::StorageConfig, ObjectStore, StoreError};

#[derive(Clone)]
pub struct S3Store {
    client: Client,
    container: String,
}

impl S3Store {
    pub async fn new(config: StorageConfig) -> Result<Self> {
        debug!(
            endpoint = ?config.endpoint,
            region = %config.region,
            container = %config.container,
            "Initializing blob storage"
        );

        let mut builder = match config.static_credentials() {
            Some((access_key, secret_key)) => aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .credentials_provider(Credentials::new(
                    access_key,
                    secret_key,
                    None,
                    None,
                    "tars-storage",
                ))
                .region(Region::new(config.region.clone())),
            None => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            },
        };

        builder = builder.force_path_style(config.path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(builder.build());

        info!(container = %config.container, "Blob storage client initialized");

        Ok(Self::from_client(client, config.container))
    }

    pub fn from_client(client: Client, container: impl Into<String>) -> Self {
        Self {
            client,
            container: container.into(),
        }
    }

    fn unavailable<E>(&self, operation: &'static str, err: E) -> StoreError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::unavailable(&self.container, operation, err)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn container(&self) -> &str {
        &self.container
    }

    #[instrument(skip(self), fields(container = %self.container))]
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.container)
            .into_paginator()
            .send();

        let mut names = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| self.unavailable("list", e))?;
            names.extend(
                page.contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_string)),
            );
        }

        debug!(count = names.len(), "Listed blobs");
        Ok(names)
    }

    #[instrument(skip(self), fields(container = %self.container))]
    async fn download(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.container)
            .key(name)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StoreError::not_found(&self.container, name)
                } else {
                    self.unavailable("download", e)
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| self.unavailable("download", e))?
            .into_bytes()
            .to_vec();

        debug!(bytes = data.len(), "Downloaded blob");
        Ok(data)
    }

    #[instrument(skip(self, data), fields(container = %self.container, bytes = data.len()))]
    async fn upload(&self, name: &str, data: Vec<u8>) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.container)
            .key(name)
            .content_type("application/json")
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| self.unavailable("upload", e))?;

        info!(name, "Uploaded blob");
        Ok(())
    }

    #[instrument(skip(self), fields(container = %self.container))]
    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(&self.container)
            .key(name)
            .send()
            .await
            .map_err(|e| self.unavailable("delete", e))?;

        debug!(name, "Deleted blob");
        Ok(())
    }

    #[instrument(skip(self), fields(container = %self.container))]
    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.container)
            .key(name)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(self.unavailable("exists", e)),
        }
    }
}
