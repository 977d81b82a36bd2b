//! Document registry
//!
//! `DocumentStore` is the only writer of the documents table. The
//! registration path inserts rows; the parsing orchestrator is the only
//! caller of the parse-outcome updates, and only for ids delivered to it
//! via ingestion events.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use super::DbError;
use crate::document::{Document, ParseState};

/// Metadata for a document being registered.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: i64,
    pub user_id: i64,
    pub file_key: String,
    pub filename: String,
    pub filetype: String,
    pub filesize: i64,
}

#[derive(FromRow)]
struct DocumentRow {
    id: i64,
    user_id: i64,
    file_key: String,
    filename: String,
    filetype: String,
    filesize: i64,
    parse_state: i32,
    deleted: i64,
    llm_parse_content: String,
    parse_error: String,
    updated_at: i64,
}

impl DocumentRow {
    fn into_document(self) -> Result<Document, DbError> {
        let parse_state =
            ParseState::from_i32(self.parse_state).ok_or(DbError::CorruptRow {
                id: self.id,
                message: format!("unknown parse_state {}", self.parse_state),
            })?;
        let updated_at = DateTime::<Utc>::from_timestamp_millis(self.updated_at)
            .ok_or(DbError::CorruptRow {
                id: self.id,
                message: format!("bad updated_at {}", self.updated_at),
            })?;
        Ok(Document {
            id: self.id,
            user_id: self.user_id,
            file_key: self.file_key,
            filename: self.filename,
            filetype: self.filetype,
            filesize: self.filesize,
            parse_state,
            deleted: self.deleted != 0,
            llm_parse_content: self.llm_parse_content,
            parse_error: self.parse_error,
            updated_at,
        })
    }
}

#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a document in `Parsing` state.
    ///
    /// Idempotent against duplicate registrations carrying the same id:
    /// the conflict clause leaves the existing row untouched and the
    /// stored row is returned either way.
    pub async fn create(&self, new: &NewDocument) -> Result<Document, DbError> {
        sqlx::query(
            r#"
            INSERT INTO documents
                (id, user_id, file_key, filename, filetype, filesize,
                 parse_state, deleted, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(new.id)
        .bind(new.user_id)
        .bind(&new.file_key)
        .bind(&new.filename)
        .bind(&new.filetype)
        .bind(new.filesize)
        .bind(ParseState::Parsing.as_i32())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        self.get(new.id).await
    }

    pub async fn get(&self, id: i64) -> Result<Document, DbError> {
        let row: Option<DocumentRow> =
            sqlx::query_as("SELECT * FROM documents WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.ok_or(DbError::DocumentNotFound(id))?.into_document()
    }

    /// Transition to `Succeeded` and store the serialized parse result.
    pub async fn mark_parse_succeeded(
        &self,
        id: i64,
        llm_parse_content: &str,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET parse_state = ?, llm_parse_content = ?, parse_error = '',
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(ParseState::Succeeded.as_i32())
        .bind(llm_parse_content)
        .bind(Utc::now().timestamp_millis())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::DocumentNotFound(id));
        }
        Ok(())
    }

    /// Transition to `Failed` and store a short error summary.
    pub async fn mark_parse_failed(
        &self,
        id: i64,
        parse_error: &str,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET parse_state = ?, parse_error = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(ParseState::Failed.as_i32())
        .bind(parse_error)
        .bind(Utc::now().timestamp_millis())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::DocumentNotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn new_doc(id: i64) -> NewDocument {
        NewDocument {
            id,
            user_id: 7,
            file_key: format!("resume/7/{id}.pdf"),
            filename: "cv.pdf".to_string(),
            filetype: "pdf".to_string(),
            filesize: 10_240,
        }
    }

    #[tokio::test]
    async fn test_create_starts_in_parsing() {
        let store = DocumentStore::new(test_pool().await);
        let doc = store.create(&new_doc(1)).await.unwrap();

        assert_eq!(doc.id, 1);
        assert_eq!(doc.parse_state, ParseState::Parsing);
        assert!(!doc.deleted);
        assert!(doc.llm_parse_content.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_idempotent() {
        let store = DocumentStore::new(test_pool().await);
        let first = store.create(&new_doc(1)).await.unwrap();

        // A retried registration with the same id but different metadata
        // must not overwrite the immutable fields.
        let mut retry = new_doc(1);
        retry.filename = "other.pdf".to_string();
        retry.file_key = "resume/7/999.pdf".to_string();
        let second = store.create(&retry).await.unwrap();

        assert_eq!(second.file_key, first.file_key);
        assert_eq!(second.filename, first.filename);
    }

    #[tokio::test]
    async fn test_mark_parse_succeeded() {
        let store = DocumentStore::new(test_pool().await);
        store.create(&new_doc(1)).await.unwrap();

        store
            .mark_parse_succeeded(1, r#"{"skills":["rust"]}"#)
            .await
            .unwrap();

        let doc = store.get(1).await.unwrap();
        assert_eq!(doc.parse_state, ParseState::Succeeded);
        assert_eq!(doc.llm_parse_content, r#"{"skills":["rust"]}"#);
        assert!(doc.parse_error.is_empty());
    }

    #[tokio::test]
    async fn test_mark_parse_failed() {
        let store = DocumentStore::new(test_pool().await);
        store.create(&new_doc(1)).await.unwrap();

        store.mark_parse_failed(1, "no readable text").await.unwrap();

        let doc = store.get(1).await.unwrap();
        assert_eq!(doc.parse_state, ParseState::Failed);
        assert_eq!(doc.parse_error, "no readable text");
    }

    #[tokio::test]
    async fn test_updates_on_missing_row() {
        let store = DocumentStore::new(test_pool().await);
        assert!(matches!(
            store.mark_parse_succeeded(99, "{}").await,
            Err(DbError::DocumentNotFound(99))
        ));
        assert!(matches!(
            store.get(99).await,
            Err(DbError::DocumentNotFound(99))
        ));
    }
}
