#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use config::Map;
use http_body_util::BodyExt;
use serde_json::Value;

use content_processor::config::AppConfig;
use content_processor::db::models::document::Document;
use content_processor::db::store::{ListQuery, ProcessingUpdate, SearchQuery};
use content_processor::db::{DocumentStore, MemoryDocumentStore};
use content_processor::routes;
use content_processor::state::AppState;

pub const BOUNDARY: &str = "content-processor-test-boundary";

pub fn test_config() -> AppConfig {
    test_config_with(&[])
}

/// Test profile plus extra flat environment variables.
pub fn test_config_with(extra: &[(&str, &str)]) -> AppConfig {
    let mut vars = Map::new();
    vars.insert("RUN_ENV".to_string(), "test".to_string());
    for (key, value) in extra {
        vars.insert(key.to_string(), value.to_string());
    }
    AppConfig::from_env(&vars).expect("test configuration loads")
}

pub fn app_with_config(config: AppConfig) -> Router {
    routes::router(AppState::new(config, Arc::new(MemoryDocumentStore::new())))
}

pub fn app_with_store(store: Arc<dyn DocumentStore>) -> Router {
    routes::router(AppState::new(test_config(), store))
}

pub fn app() -> (Router, Arc<MemoryDocumentStore>) {
    let store = Arc::new(MemoryDocumentStore::new());
    (app_with_store(store.clone()), store)
}

/// A store whose backend is unreachable.
pub struct UnavailableStore;

#[async_trait]
impl DocumentStore for UnavailableStore {
    async fn ping(&self) -> Result<()> {
        bail!("connection refused")
    }

    async fn insert(&self, _document: &Document) -> Result<String> {
        bail!("connection refused")
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<Document>> {
        bail!("connection refused")
    }

    async fn list(&self, _query: &ListQuery) -> Result<Vec<Document>> {
        bail!("connection refused")
    }

    async fn delete(&self, _id: &str) -> Result<bool> {
        bail!("connection refused")
    }

    async fn update_processing(&self, _id: &str, _update: &ProcessingUpdate) -> Result<bool> {
        bail!("connection refused")
    }

    async fn search(&self, _query: &SearchQuery) -> Result<(Vec<Document>, u64)> {
        bail!("connection refused")
    }
}

pub fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub const SAMPLE_NOTES: &str = "Rust Ownership Notes

Ownership is a set of rules that govern how a Rust program manages memory. \
Every value in Rust has an owner. There can only be one owner at a time. \
When the owner goes out of scope, the value will be dropped.

Borrowing lets code use a value without taking ownership of it. \
References must always be valid, and the borrow checker enforces that \
a value is not mutated while it is shared with other parts of the program.";
