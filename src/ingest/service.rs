//! Upload coordination and document registration
//!
//! `request_upload_location` issues an upload slot without touching the
//! registry: a document only officially exists once the client confirms
//! the upload and calls `register_document`. That split avoids phantom
//! rows for abandoned uploads.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{EventPublisher, IdGenerator, IngestError, IngestionEvent};
use crate::db::{DocumentStore, NewDocument};
use crate::document::Document;
use crate::storage::ObjectStore;

/// A freshly issued upload slot.
#[derive(Debug, Clone, Serialize)]
pub struct UploadLocation {
    pub file_id: i64,
    pub file_key: String,
    pub upload_url: String,
}

/// Client-confirmed metadata for a completed upload. `file_id` and
/// `file_key` must be the ones issued by `request_upload_location`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterDocument {
    pub file_id: i64,
    pub file_key: String,
    pub filename: String,
    pub filetype: String,
    pub filesize: i64,
}

pub struct IngestService {
    ids: Arc<dyn IdGenerator>,
    store: Arc<dyn ObjectStore>,
    registry: DocumentStore,
    publisher: EventPublisher,
}

impl IngestService {
    pub fn new(
        ids: Arc<dyn IdGenerator>,
        store: Arc<dyn ObjectStore>,
        registry: DocumentStore,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            ids,
            store,
            registry,
            publisher,
        }
    }

    /// Issue a document id, its storage key, and a time-bounded write URL.
    ///
    /// No registry state is created here; both failure paths collapse
    /// into `UploadPreparation` and leave nothing behind.
    pub async fn request_upload_location(
        &self,
        user_id: i64,
        filename: &str,
    ) -> Result<UploadLocation, IngestError> {
        let file_id = self
            .ids
            .next_id()
            .await
            .map_err(|e| IngestError::UploadPreparation(e.to_string()))?;

        let file_key = derive_file_key(user_id, file_id, filename);

        let upload_url = self
            .store
            .presigned_put_url(&file_key, None)
            .await
            .map_err(|e| IngestError::UploadPreparation(e.to_string()))?;

        tracing::info!(
            user_id,
            file_id,
            file_key = %file_key,
            "Issued upload location"
        );

        Ok(UploadLocation {
            file_id,
            file_key,
            upload_url,
        })
    }

    /// Register a document and trigger asynchronous parsing.
    ///
    /// The row is committed before the event is enqueued, and the
    /// enqueue can neither block nor fail this call: by the time the
    /// publish worker runs, registration has already returned.
    pub async fn register_document(
        &self,
        user_id: i64,
        request: RegisterDocument,
    ) -> Result<Document, IngestError> {
        let document = self
            .registry
            .create(&NewDocument {
                id: request.file_id,
                user_id,
                file_key: request.file_key,
                filename: request.filename,
                filetype: request.filetype,
                filesize: request.filesize,
            })
            .await?;

        tracing::info!(
            user_id,
            file_id = document.id,
            file_key = %document.file_key,
            "Registered document"
        );

        self.publisher.submit(IngestionEvent::from_document(&document));

        Ok(document)
    }

    /// Fetch a document for its owner, with a presigned read URL when
    /// the presign succeeds. A presign failure degrades to no URL rather
    /// than failing the read.
    pub async fn get_document(
        &self,
        user_id: i64,
        id: i64,
    ) -> Result<(Document, Option<String>), IngestError> {
        let document = self.registry.get(id).await?;
        if document.user_id != user_id {
            // Same shape as a missing row: do not leak other users' ids.
            return Err(IngestError::Registration(
                crate::db::DbError::DocumentNotFound(id),
            ));
        }

        let download_url = match self
            .store
            .presigned_get_url(&document.file_key, None)
            .await
        {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::warn!(
                    file_id = id,
                    error = %err,
                    "Presigned read URL unavailable"
                );
                None
            }
        };

        Ok((document, download_url))
    }
}

/// Storage key layout: `resume/{user_id}/{file_id}{ext}`.
///
/// The generated id makes the key unique; the owner prefix keeps keys
/// from different users in disjoint namespaces.
pub(crate) fn derive_file_key(user_id: i64, file_id: i64, filename: &str) -> String {
    let ext = filename
        .rfind('.')
        .map(|idx| &filename[idx..])
        .unwrap_or("");
    format!("resume/{user_id}/{file_id}{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{MemoryBroker, MessageQueue};
    use crate::db::test_pool;
    use crate::ingest::{MonotonicIdGenerator, PublisherConfig};
    use crate::storage::StorageError;

    use std::time::Duration;

    use async_trait::async_trait;

    struct StubStore {
        fail_presign: bool,
    }

    #[async_trait]
    impl ObjectStore for StubStore {
        async fn put(
            &self,
            _key: &str,
            _data: Vec<u8>,
            _content_type: Option<&str>,
        ) -> Result<(), StorageError> {
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
            Err(StorageError::NotFound(key.to_string()))
        }

        async fn delete(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }

        async fn presigned_get_url(
            &self,
            key: &str,
            _ttl: Option<Duration>,
        ) -> Result<String, StorageError> {
            Ok(format!("http://storage.local/get/{key}"))
        }

        async fn presigned_put_url(
            &self,
            key: &str,
            _ttl: Option<Duration>,
        ) -> Result<String, StorageError> {
            if self.fail_presign {
                return Err(StorageError::Presign {
                    key: key.to_string(),
                    message: "backend down".to_string(),
                });
            }
            Ok(format!("http://storage.local/put/{key}"))
        }
    }

    async fn service(
        broker: MemoryBroker,
        fail_presign: bool,
    ) -> (IngestService, tokio::task::JoinHandle<()>) {
        let (publisher, worker) = EventPublisher::spawn(
            Arc::new(broker),
            PublisherConfig::new("resume.parse", 16),
        );
        let service = IngestService::new(
            Arc::new(MonotonicIdGenerator::new()),
            Arc::new(StubStore { fail_presign }),
            DocumentStore::new(test_pool().await),
            publisher,
        );
        (service, worker)
    }

    #[test]
    fn test_file_key_layout() {
        assert_eq!(derive_file_key(7, 42, "cv.pdf"), "resume/7/42.pdf");
        assert_eq!(derive_file_key(7, 42, "archive.tar.gz"), "resume/7/42.gz");
        assert_eq!(derive_file_key(7, 42, "no_extension"), "resume/7/42");
    }

    #[tokio::test]
    async fn test_upload_locations_never_collide() {
        let (service, _worker) = service(MemoryBroker::new(4), false).await;

        let first = service.request_upload_location(7, "cv.pdf").await.unwrap();
        let second = service.request_upload_location(7, "cv.pdf").await.unwrap();

        assert!(first.file_key.contains("resume/7/"));
        assert_ne!(first.file_id, second.file_id);
        assert_ne!(first.file_key, second.file_key);
    }

    #[tokio::test]
    async fn test_presign_failure_is_upload_preparation() {
        let (service, _worker) = service(MemoryBroker::new(4), true).await;

        let result = service.request_upload_location(7, "cv.pdf").await;
        assert!(matches!(result, Err(IngestError::UploadPreparation(_))));
    }

    #[tokio::test]
    async fn test_registration_publishes_event_keyed_by_file_key() {
        let broker = MemoryBroker::new(4);
        let mut sub = broker
            .subscribe(&["resume.parse".to_string()])
            .await
            .unwrap();
        let (service, _worker) = service(broker, false).await;

        let location = service.request_upload_location(7, "cv.pdf").await.unwrap();
        let document = service
            .register_document(
                7,
                RegisterDocument {
                    file_id: location.file_id,
                    file_key: location.file_key.clone(),
                    filename: "cv.pdf".to_string(),
                    filetype: "pdf".to_string(),
                    filesize: 10_240,
                },
            )
            .await
            .unwrap();

        let message = sub
            .poll(Duration::from_secs(2))
            .await
            .unwrap()
            .expect("event published after registration");
        assert_eq!(message.key, location.file_key.as_bytes());

        let event: IngestionEvent = serde_json::from_slice(&message.value).unwrap();
        assert_eq!(event.file_id, document.id);
        assert_eq!(event.file_key, document.file_key);
        assert_eq!(event.filesize, 10_240);
    }

    #[tokio::test]
    async fn test_get_document_hides_other_owners() {
        let (service, _worker) = service(MemoryBroker::new(4), false).await;

        let location = service.request_upload_location(7, "cv.pdf").await.unwrap();
        service
            .register_document(
                7,
                RegisterDocument {
                    file_id: location.file_id,
                    file_key: location.file_key,
                    filename: "cv.pdf".to_string(),
                    filetype: "pdf".to_string(),
                    filesize: 1,
                },
            )
            .await
            .unwrap();

        assert!(service.get_document(7, location.file_id).await.is_ok());
        assert!(service.get_document(8, location.file_id).await.is_err());
    }
}
