use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::models::document::{Document, DocumentChunk, DocumentStatus};

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub user_id: Option<String>,
    pub skip: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub query: String,
    pub user_id: Option<String>,
    pub status: Option<DocumentStatus>,
    pub file_type: Option<String>,
    pub skip: usize,
    pub limit: usize,
}

/// Fields rewritten when a stored document is processed again.
#[derive(Debug, Clone)]
pub struct ProcessingUpdate {
    pub chunks: Vec<DocumentChunk>,
    pub summary: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub status: DocumentStatus,
}

/// Persistence for processed documents.
///
/// Lookups by an id that is unknown or malformed report "not found"
/// (`None` / `false`) rather than an error.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn insert(&self, document: &Document) -> Result<String>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Document>>;

    /// Newest uploads first.
    async fn list(&self, query: &ListQuery) -> Result<Vec<Document>>;

    async fn delete(&self, id: &str) -> Result<bool>;

    async fn update_processing(&self, id: &str, update: &ProcessingUpdate) -> Result<bool>;

    /// Matching page plus the total number of matches.
    async fn search(&self, query: &SearchQuery) -> Result<(Vec<Document>, u64)>;
}
