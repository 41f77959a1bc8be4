use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::models::document::Document;
use crate::db::store::{DocumentStore, ListQuery, ProcessingUpdate, SearchQuery};

/// In-process store used when the service runs with `TESTING=true`.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<String, Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

fn newest_first(mut docs: Vec<Document>) -> Vec<Document> {
    docs.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
    docs
}

fn matches_terms(doc: &Document, terms: &[String]) -> bool {
    let haystack = format!("{} {}", doc.title, doc.content).to_lowercase();
    terms.iter().all(|term| haystack.contains(term.as_str()))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert(&self, document: &Document) -> Result<String> {
        self.documents
            .write()
            .await
            .insert(document.id.clone(), document.clone());
        Ok(document.id.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Document>> {
        let docs = self
            .documents
            .read()
            .await
            .values()
            .filter(|d| query.user_id.is_none() || d.user_id == query.user_id)
            .cloned()
            .collect();

        Ok(newest_first(docs)
            .into_iter()
            .skip(query.skip)
            .take(query.limit)
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.documents.write().await.remove(id).is_some())
    }

    async fn update_processing(&self, id: &str, update: &ProcessingUpdate) -> Result<bool> {
        let mut documents = self.documents.write().await;
        let Some(doc) = documents.get_mut(id) else {
            return Ok(false);
        };

        doc.chunks = update.chunks.clone();
        doc.summary = update.summary.clone();
        doc.processed_at = Some(update.processed_at);
        doc.status = update.status;
        Ok(true)
    }

    async fn search(&self, query: &SearchQuery) -> Result<(Vec<Document>, u64)> {
        let terms: Vec<String> = query
            .query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();

        let matching: Vec<Document> = self
            .documents
            .read()
            .await
            .values()
            .filter(|d| query.user_id.is_none() || d.user_id == query.user_id)
            .filter(|d| query.status.is_none_or(|s| d.status == s))
            .filter(|d| {
                query
                    .file_type
                    .as_deref()
                    .is_none_or(|ft| d.metadata.file_type == ft)
            })
            .filter(|d| matches_terms(d, &terms))
            .cloned()
            .collect();

        let total = matching.len() as u64;
        let page = newest_first(matching)
            .into_iter()
            .skip(query.skip)
            .take(query.limit)
            .collect();

        Ok((page, total))
    }
}
