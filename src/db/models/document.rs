use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::store::{DocumentStore, ListQuery, ProcessingUpdate, SearchQuery};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub chunks: Vec<DocumentChunk>,
    pub user_id: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub metadata: DocumentMetadata,
    pub status: DocumentStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    pub author: Option<String>,
    pub pages: Option<u32>,
    pub language: Option<String>,
    pub file_type: String,
    pub file_size: u64,
    pub word_count: Option<usize>,
    pub character_count: Option<usize>,
    /// Minutes, at 200 words per minute.
    pub estimated_reading_time: Option<usize>,
}

/// A slice of the cleaned document text. Positions are character offsets,
/// `end_position` exclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    pub index: usize,
    pub content: String,
    pub start_position: usize,
    pub end_position: usize,
    pub word_count: usize,
    pub character_count: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Processing => write!(f, "processing"),
            DocumentStatus::Completed => write!(f, "completed"),
            DocumentStatus::Failed => write!(f, "failed"),
        }
    }
}

impl TryFrom<&str> for DocumentStatus {
    type Error = anyhow::Error;
    fn try_from(value: &str) -> Result<Self> {
        match value {
            "processing" => Ok(DocumentStatus::Processing),
            "completed" => Ok(DocumentStatus::Completed),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(anyhow::anyhow!("Invalid document status: {other}")),
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, title, content, summary, chunks, user_id, uploaded_at,
        processed_at, metadata, status
 FROM books";

const SEARCH_FILTER: &str = "WHERE to_tsvector('simple', title || ' ' || content)
        @@ plainto_tsquery('simple', $1)
   AND ($2::text IS NULL OR user_id = $2)
   AND ($3::text IS NULL OR status = $3)
   AND ($4::text IS NULL OR metadata->>'file_type' = $4)";

/// PostgreSQL-backed document store over the `books` table.
#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> Result<Document> {
        let status: String = row.try_get("status").context("Failed to get status")?;
        let chunks: Json<Vec<DocumentChunk>> =
            row.try_get("chunks").context("Failed to get chunks")?;
        let metadata: Json<DocumentMetadata> =
            row.try_get("metadata").context("Failed to get metadata")?;

        Ok(Document {
            id: row.try_get("id").context("Failed to get id")?,
            title: row.try_get("title").context("Failed to get title")?,
            content: row.try_get("content").context("Failed to get content")?,
            summary: row.try_get("summary").context("Failed to get summary")?,
            chunks: chunks.0,
            user_id: row.try_get("user_id").context("Failed to get user_id")?,
            uploaded_at: row
                .try_get("uploaded_at")
                .context("Failed to get uploaded_at")?,
            processed_at: row
                .try_get("processed_at")
                .context("Failed to get processed_at")?,
            metadata: metadata.0,
            status: DocumentStatus::try_from(status.as_str())?,
        })
    }
}

/// Ids are UUIDs; anything else can never match a stored row.
fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}

/// OFFSET/LIMIT value; anything past `i64::MAX` saturates.
fn sql_bound(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl DocumentStore for DocumentRepository {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    async fn insert(&self, document: &Document) -> Result<String> {
        sqlx::query(
            "INSERT INTO books
                 (id, title, content, summary, chunks, user_id, uploaded_at, processed_at, metadata, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&document.id)
        .bind(&document.title)
        .bind(&document.content)
        .bind(&document.summary)
        .bind(Json(&document.chunks))
        .bind(&document.user_id)
        .bind(document.uploaded_at)
        .bind(document.processed_at)
        .bind(Json(&document.metadata))
        .bind(document.status.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to insert document")?;

        tracing::info!("Document saved to database with ID: {}", document.id);
        Ok(document.id.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };

        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query document")?;

        row.map(|r| Self::map_row(&r)).transpose()
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS}
             WHERE ($1::text IS NULL OR user_id = $1)
             ORDER BY uploaded_at DESC
             OFFSET $2 LIMIT $3"
        ))
        .bind(&query.user_id)
        .bind(sql_bound(query.skip))
        .bind(sql_bound(query.limit))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list documents")?;

        rows.iter().map(Self::map_row).collect()
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let Some(id) = parse_id(id) else {
            return Ok(false);
        };

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete document")?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_processing(&self, id: &str, update: &ProcessingUpdate) -> Result<bool> {
        let Some(id) = parse_id(id) else {
            return Ok(false);
        };

        let result = sqlx::query(
            "UPDATE books SET chunks = $1, summary = $2, processed_at = $3, status = $4
             WHERE id = $5",
        )
        .bind(Json(&update.chunks))
        .bind(&update.summary)
        .bind(update.processed_at)
        .bind(update.status.to_string())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update document")?;

        Ok(result.rows_affected() > 0)
    }

    async fn search(&self, query: &SearchQuery) -> Result<(Vec<Document>, u64)> {
        let status = query.status.map(|s| s.to_string());

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM books {SEARCH_FILTER}"))
            .bind(&query.query)
            .bind(&query.user_id)
            .bind(&status)
            .bind(&query.file_type)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count search results")?;

        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} {SEARCH_FILTER}
             ORDER BY uploaded_at DESC
             OFFSET $5 LIMIT $6"
        ))
        .bind(&query.query)
        .bind(&query.user_id)
        .bind(&status)
        .bind(&query.file_type)
        .bind(sql_bound(query.skip))
        .bind(sql_bound(query.limit))
        .fetch_all(&self.pool)
        .await
        .context("Failed to search documents")?;

        let documents = rows.iter().map(Self::map_row).collect::<Result<Vec<_>>>()?;
        Ok((documents, total.max(0) as u64))
    }
}
