use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::document::{Document, DocumentMetadata, DocumentStatus};

pub const DEFAULT_PAGE_SIZE: usize = 20;

fn default_limit() -> usize {
    DEFAULT_PAGE_SIZE
}

/// A stored document without its body text and chunks.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: String,
    pub title: String,
    pub summary: Option<String>,
    pub user_id: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub metadata: DocumentMetadata,
    pub status: DocumentStatus,
    pub chunks_count: usize,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            chunks_count: doc.chunks.len(),
            id: doc.id,
            title: doc.title,
            summary: doc.summary,
            user_id: doc.user_id,
            uploaded_at: doc.uploaded_at,
            processed_at: doc.processed_at,
            metadata: doc.metadata,
            status: doc.status,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentUploadResponse {
    pub document_id: String,
    pub filename: String,
    pub status: String,
    pub chunks_count: usize,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub user_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub skip: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchFilters {
    pub status: Option<DocumentStatus>,
    pub file_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentSearchRequest {
    pub query: String,
    pub user_id: Option<String>,
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub skip: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentSearchResponse {
    pub documents: Vec<DocumentResponse>,
    pub total_results: u64,
    pub query: String,
    pub took_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReprocessResponse {
    pub message: String,
    pub chunks_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SupportedTypesResponse {
    pub types: Vec<String>,
    pub extensions: Vec<String>,
}
