//! SQLite persistence
//!
//! The document registry is the only table this service owns. WAL mode
//! keeps the synchronous registration path from blocking on the
//! consumer's parse-outcome writes.

mod documents;
mod schema;

pub use documents::{DocumentStore, NewDocument};
pub use schema::initialize_schema;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("document not found: {0}")]
    DocumentNotFound(i64),

    #[error("corrupt row for document {id}: {message}")]
    CorruptRow { id: i64, message: String },

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Create a connection pool and initialize the schema.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(sqlx::Error::from)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    // A :memory: database is private to its connection, so it gets a
    // single permanent one; every query must see the same schema.
    let mut pool_options = SqlitePoolOptions::new().max_connections(5);
    if database_url.contains(":memory:") {
        pool_options = pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options.connect_with(options).await?;

    initialize_schema(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    create_pool("sqlite::memory:").await.expect("in-memory pool")
}
