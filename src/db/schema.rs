//! Database schema initialization

use sqlx::SqlitePool;

use super::DbError;

/// Initialize the database schema
pub async fn initialize_schema(pool: &SqlitePool) -> Result<(), DbError> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Documents table (resume registry)
--
-- parse_state: 1=parsing 2=succeeded 3=failed
-- deleted:     soft-delete flag, orthogonal to the parse lifecycle
-- updated_at:  unix epoch milliseconds
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    file_key TEXT NOT NULL UNIQUE,
    filename TEXT NOT NULL,
    filetype TEXT NOT NULL,
    filesize INTEGER NOT NULL,
    parse_state INTEGER NOT NULL DEFAULT 1,
    deleted INTEGER NOT NULL DEFAULT 0,
    llm_parse_content TEXT NOT NULL DEFAULT '',
    parse_error TEXT NOT NULL DEFAULT '',
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_user_id ON documents(user_id);
CREATE INDEX IF NOT EXISTS idx_documents_parse_state ON documents(parse_state);
"#;
