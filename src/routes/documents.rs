use std::time::Instant;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
};

use crate::db::store::{ListQuery, SearchQuery};
use crate::dto::document::{
    DocumentResponse, DocumentSearchRequest, DocumentSearchResponse, DocumentUploadResponse,
    ListParams, MessageResponse, ReprocessResponse, SupportedTypesResponse, UploadParams,
};
use crate::errors::AppError;
use crate::services::{file_validator, text_extract};
use crate::state::AppState;

const UPLOAD_FIELD: &str = "file";

struct Upload {
    filename: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart data: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;

        return Ok(Upload {
            filename,
            content_type,
            data: data.to_vec(),
        });
    }

    Err(AppError::MissingField(UPLOAD_FIELD.to_string()))
}

pub async fn upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Json<DocumentUploadResponse>, AppError> {
    let upload = read_upload(&mut multipart).await?;
    let processing = &state.config.processing;

    file_validator::validate_upload(
        upload.filename.as_deref(),
        upload.content_type.as_deref(),
        Some(upload.data.len()),
        processing,
    )?;

    // validate_upload guarantees both are present
    let filename = file_validator::sanitize_filename(upload.filename.as_deref().unwrap_or_default());
    let content_type = upload.content_type.unwrap_or_default();

    file_validator::validate_content(&upload.data, &filename, processing)?;

    let extracted = text_extract::extract_text(&upload.data, &filename, &content_type)
        .await
        .map_err(|e| AppError::Processing(format!("Upload failed: {e}")))?;

    let mut document = state.processor.process_document(
        &extracted.text,
        &filename,
        &content_type,
        upload.data.len() as u64,
        params.user_id,
    );
    document.metadata.pages = extracted.pages;
    document.metadata.author = extracted.author;

    let document_id = state
        .store
        .insert(&document)
        .await
        .map_err(|e| AppError::Processing(format!("Upload failed: {e}")))?;

    tracing::info!("Document {document_id} uploaded with {} chunks", document.chunks.len());

    Ok(Json(DocumentUploadResponse {
        document_id,
        filename,
        status: "processed".to_string(),
        chunks_count: document.chunks.len(),
        message: "Document uploaded and processed successfully".to_string(),
    }))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<DocumentResponse>>, AppError> {
    let docs = state
        .store
        .list(&ListQuery {
            user_id: params.user_id,
            skip: params.skip,
            limit: params.limit,
        })
        .await?;

    Ok(Json(docs.into_iter().map(DocumentResponse::from).collect()))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, AppError> {
    let doc = state
        .store
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

    Ok(Json(doc.into()))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    if !state.store.delete(&id).await? {
        return Err(AppError::NotFound("Document not found".to_string()));
    }

    tracing::info!("Document {id} deleted");
    Ok(Json(MessageResponse {
        message: "Document deleted successfully".to_string(),
    }))
}

pub async fn reprocess(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReprocessResponse>, AppError> {
    let doc = state
        .store
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

    let update = state.processor.reprocess(&doc);
    let chunks_count = update.chunks.len();

    let updated = state
        .store
        .update_processing(&id, &update)
        .await
        .map_err(|e| AppError::Processing(format!("Failed to reprocess document {id}: {e}")))?;
    if !updated {
        return Err(AppError::NotFound("Document not found".to_string()));
    }

    Ok(Json(ReprocessResponse {
        message: "Document reprocessed successfully".to_string(),
        chunks_count,
    }))
}

pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<DocumentSearchRequest>,
) -> Result<Json<DocumentSearchResponse>, AppError> {
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Err(AppError::Validation("Search query must not be empty".to_string()));
    }

    let started = Instant::now();
    let (docs, total_results) = state
        .store
        .search(&SearchQuery {
            query: query.clone(),
            user_id: request.user_id,
            status: request.filters.status,
            file_type: request.filters.file_type,
            skip: request.skip,
            limit: request.limit,
        })
        .await?;

    Ok(Json(DocumentSearchResponse {
        documents: docs.into_iter().map(DocumentResponse::from).collect(),
        total_results,
        query,
        took_ms: started.elapsed().as_millis() as u64,
    }))
}

pub async fn supported_types(State(state): State<AppState>) -> Json<SupportedTypesResponse> {
    let processing = &state.config.processing;
    // only types the extractor can actually read
    let types = processing
        .allowed_file_types
        .iter()
        .filter(|t| text_extract::supported_types().contains(&t.as_str()))
        .cloned()
        .collect();

    Json(SupportedTypesResponse {
        types,
        extensions: processing.allowed_file_extensions.clone(),
    })
}
