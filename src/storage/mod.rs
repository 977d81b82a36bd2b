//! Object storage
//!
//! `ObjectStore` is the seam between the pipeline and whichever
//! S3-compatible backend is configured (MinIO, R2, B2, AWS S3). The
//! pipeline only ever sees opaque keys; key layout is decided by the
//! upload coordinator.

mod s3;

pub use s3::S3Store;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Default TTL for presigned read URLs: 7 days.
pub const DEFAULT_GET_URL_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Default TTL for presigned write URLs: 1 hour.
pub const DEFAULT_PUT_URL_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("put failed for {key}: {message}")]
    Put { key: String, message: String },

    #[error("get failed for {key}: {message}")]
    Get { key: String, message: String },

    #[error("delete failed for {key}: {message}")]
    Delete { key: String, message: String },

    #[error("presign failed for {key}: {message}")]
    Presign { key: String, message: String },
}

/// S3-style object storage collaborator.
///
/// Presigned URLs let clients move bytes directly against the backend;
/// the service itself only fetches objects when parsing them.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Time-bounded read URL. `ttl` defaults to [`DEFAULT_GET_URL_TTL`].
    async fn presigned_get_url(
        &self,
        key: &str,
        ttl: Option<Duration>,
    ) -> Result<String, StorageError>;

    /// Time-bounded write URL scoped to `key`. `ttl` defaults to
    /// [`DEFAULT_PUT_URL_TTL`].
    async fn presigned_put_url(
        &self,
        key: &str,
        ttl: Option<Duration>,
    ) -> Result<String, StorageError>;
}
