use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DocumentStore;
use crate::services::document_processor::DocumentProcessor;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub processor: Arc<DocumentProcessor>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> Self {
        let processor = DocumentProcessor::new(&config.processing);
        Self {
            config: Arc::new(config),
            store,
            processor: Arc::new(processor),
        }
    }
}
