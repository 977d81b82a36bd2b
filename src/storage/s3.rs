//! S3-compatible object store client
//!
//! Path-style addressing is forced so MinIO and other self-hosted
//! backends work without virtual-host DNS setup.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use super::{
    ObjectStore, StorageError, DEFAULT_GET_URL_TTL, DEFAULT_PUT_URL_TTL,
};
use crate::config::StorageConfig;

#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build a client from configuration and ensure the bucket exists.
    pub async fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "static",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version_latest()
            .endpoint_url(&config.endpoint)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let store = Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        };
        store.create_bucket_if_missing().await?;
        Ok(store)
    }

    async fn create_bucket_if_missing(&self) -> Result<(), StorageError> {
        let exists = self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok();
        if exists {
            return Ok(());
        }

        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::Put {
                key: self.bucket.clone(),
                message: format!("create bucket failed: {e}"),
            })?;
        tracing::info!(bucket = %self.bucket, "Created storage bucket");
        Ok(())
    }

    fn presign_config(ttl: Duration, key: &str) -> Result<PresigningConfig, StorageError> {
        PresigningConfig::expires_in(ttl).map_err(|e| StorageError::Presign {
            key: key.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data));
        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }

        request.send().await.map_err(|e| StorageError::Put {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::Get {
                        key: key.to_string(),
                        message: service_error.to_string(),
                    }
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Get {
                key: key.to_string(),
                message: format!("read body failed: {e}"),
            })?;
        Ok(data.into_bytes().to_vec())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        ttl: Option<Duration>,
    ) -> Result<String, StorageError> {
        let ttl = ttl.unwrap_or(DEFAULT_GET_URL_TTL);
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presign_config(ttl, key)?)
            .await
            .map_err(|e| StorageError::Presign {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        Ok(presigned.uri().to_string())
    }

    async fn presigned_put_url(
        &self,
        key: &str,
        ttl: Option<Duration>,
    ) -> Result<String, StorageError> {
        let ttl = ttl.unwrap_or(DEFAULT_PUT_URL_TTL);
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presign_config(ttl, key)?)
            .await
            .map_err(|e| StorageError::Presign {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        Ok(presigned.uri().to_string())
    }
}
