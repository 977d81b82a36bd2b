//! Ingestion event schema
//!
//! The message published when a document is registered. It carries the
//! full metadata snapshot so the consumer can process it without going
//! back to the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::Document;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionEvent {
    pub file_key: String,
    pub file_id: i64,
    pub user_id: i64,
    pub filename: String,
    pub filetype: String,
    pub filesize: i64,
    pub created_at: DateTime<Utc>,
}

impl IngestionEvent {
    /// Snapshot a freshly registered document.
    pub fn from_document(document: &Document) -> Self {
        Self {
            file_key: document.file_key.clone(),
            file_id: document.id,
            user_id: document.user_id,
            filename: document.filename.clone(),
            filetype: document.filetype.clone(),
            filesize: document.filesize,
            created_at: Utc::now(),
        }
    }

    /// Partition key: all events for one file key stay ordered.
    pub fn partition_key(&self) -> &[u8] {
        self.file_key.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_roundtrip() {
        let event = IngestionEvent {
            file_key: "resume/7/42.pdf".to_string(),
            file_id: 42,
            user_id: 7,
            filename: "cv.pdf".to_string(),
            filetype: "pdf".to_string(),
            filesize: 10_240,
            created_at: Utc::now(),
        };

        let encoded = serde_json::to_vec(&event).unwrap();
        let decoded: IngestionEvent = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(serde_json::from_slice::<IngestionEvent>(b"not json").is_err());
        assert!(serde_json::from_slice::<IngestionEvent>(b"{}").is_err());
    }
}
