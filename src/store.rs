//! Generated document persistence
//!
//! Documents are keyed by the canonical source URL. Regeneration overwrites,
//! manual edits update in place, nothing here deletes.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{debug, info};

use crate::error::{GeneratorError, Result};

/// A stored README
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedDocument {
    /// Canonical GitHub URL the document was generated for
    pub source_url: String,
    /// Markdown content
    pub content: String,
    /// Instructions used for the last generation, if any
    pub instructions: Option<String>,
    /// First generation time
    pub created_at: DateTime<Utc>,
    /// Last generation or edit time
    pub updated_at: DateTime<Utc>,
}

/// SQLite-backed document store
#[derive(Debug, Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    /// Opens (creating if needed) the database file and runs migrations
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!("Opened document store at {}", path.display());
        Self::with_pool(pool).await
    }

    /// Opens a private in-memory database
    pub async fn in_memory() -> Result<Self> {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Creates the schema if it does not exist
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                source_url TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                instructions TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                updated_at_ms INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_updated ON documents(updated_at_ms DESC)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Inserts a document or overwrites the one stored for the same URL
    pub async fn upsert(&self, source_url: &str, content: &str, instructions: Option<&str>) -> Result<GeneratedDocument> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO documents (source_url, content, instructions, created_at, updated_at, updated_at_ms)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(source_url) DO UPDATE SET
                content = excluded.content,
                instructions = excluded.instructions,
                updated_at = excluded.updated_at,
                updated_at_ms = excluded.updated_at_ms
            "#,
        )
        .bind(source_url)
        .bind(content)
        .bind(instructions)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await?;

        debug!("Stored document for {}", source_url);
        self.get(source_url)
            .await?
            .ok_or_else(|| GeneratorError::Persistence(format!("Document for {} vanished after write", source_url)))
    }

    /// Replaces the content of an existing document without touching its instructions
    pub async fn save_edit(&self, source_url: &str, content: &str) -> Result<GeneratedDocument> {
        let now = Utc::now();
        let result = sqlx::query("UPDATE documents SET content = ?, updated_at = ?, updated_at_ms = ? WHERE source_url = ?")
            .bind(content)
            .bind(now.to_rfc3339())
            .bind(now.timestamp_millis())
            .bind(source_url)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(GeneratorError::NotFound(format!("No document stored for {}", source_url)));
        }
        self.get(source_url)
            .await?
            .ok_or_else(|| GeneratorError::Persistence(format!("Document for {} vanished after edit", source_url)))
    }

    /// Fetches the document stored for a URL
    pub async fn get(&self, source_url: &str) -> Result<Option<GeneratedDocument>> {
        let row = sqlx::query(
            "SELECT source_url, content, instructions, created_at, updated_at FROM documents WHERE source_url = ?",
        )
        .bind(source_url)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| document_from_row(&row)).transpose()
    }

    /// Most recently created or updated documents, newest first
    pub async fn recent(&self, limit: u32) -> Result<Vec<GeneratedDocument>> {
        let rows = sqlx::query(
            "SELECT source_url, content, instructions, created_at, updated_at FROM documents \
             ORDER BY updated_at_ms DESC, source_url ASC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(document_from_row).collect()
    }

    /// Number of stored documents
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<GeneratedDocument> {
    Ok(GeneratedDocument {
        source_url: row.try_get("source_url")?,
        content: row.try_get("content")?,
        instructions: row.try_get("instructions")?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_timestamp(&row.try_get::<String, _>("updated_at")?)?,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|e| GeneratorError::Persistence(format!("Invalid timestamp {:?}: {}", value, e)))
}
