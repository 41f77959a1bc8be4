pub mod document_processor;
pub mod file_validator;
pub mod text_extract;
