//! Ingestion pipeline, request side
//!
//! Everything between "client wants to upload" and "event is on the
//! broker": upload-slot issuance, document registration, and the
//! publish/consume plumbing around the ingestion event.

mod dispatcher;
mod events;
mod ids;
mod publisher;
mod service;

pub use dispatcher::{Dispatcher, EventHandler};
pub use events::IngestionEvent;
pub use ids::{IdError, IdGenerator, MonotonicIdGenerator};
pub use publisher::{publish_with_retry, EventPublisher, PublisherConfig};
pub use service::{IngestService, RegisterDocument, UploadLocation};

use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum IngestError {
    /// ID generation or presign failed; nothing was persisted.
    #[error("upload preparation failed: {0}")]
    UploadPreparation(String),

    /// Registry write failed; no event was published.
    #[error("registration failed: {0}")]
    Registration(#[from] DbError),
}
