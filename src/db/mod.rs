pub mod connection;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod store;

pub use memory::MemoryDocumentStore;
pub use models::document::DocumentRepository;
pub use store::DocumentStore;
