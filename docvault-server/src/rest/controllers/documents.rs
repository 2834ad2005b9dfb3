use axum::extract::State;
use docvault_rag::{Document, DocumentMetadata, DocumentSelector, IngestRequest};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddDocumentRequest {
    pub collection_name: String,
    pub document_name: String,
    pub document_id: String,
    /// Full document text.
    pub document: String,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub chunk_overlap: Option<usize>,
    #[serde(default)]
    pub separator: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentParams {
    pub collection_name: String,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub document_name: Option<String>,
}

impl DocumentParams {
    fn selector(&self) -> Result<DocumentSelector, ApiError> {
        Ok(DocumentSelector::new(self.document_id.clone(), self.document_name.clone())?)
    }
}

/// POST /add-document
pub async fn add_document(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AddDocumentRequest>,
) -> Result<ApiResponse, ApiError> {
    let metadata = DocumentMetadata::from_json(request.metadata)?
        .into_record(&request.document_name, &request.document_id);
    let document = Document {
        name: request.document_name,
        id: request.document_id,
        text: request.document,
        metadata,
    };
    let name = document.name.clone();

    let ingest = IngestRequest {
        document,
        chunk_size: request.chunk_size,
        chunk_overlap: request.chunk_overlap,
        separator: request.separator,
    };
    let outcome = state.pipeline.ingest(&request.collection_name, ingest).await?;

    Ok(ApiResponse::new(
        format!(
            "document '{name}' added to collection '{}' as {} chunk(s)",
            request.collection_name, outcome.chunks_count
        ),
        json!({ "document": { "name": name, "chunks_count": outcome.chunks_count } }),
    ))
}

/// GET /get-chunks
pub async fn get_chunks(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<DocumentParams>,
) -> Result<ApiResponse, ApiError> {
    let selector = params.selector()?;
    let chunks = state.pipeline.get_chunks(&params.collection_name, &selector).await?;

    let chunks_count = chunks.len();
    let (mut ids, mut documents, mut metadatas) = (Vec::new(), Vec::new(), Vec::new());
    for chunk in chunks {
        ids.push(chunk.id);
        documents.push(chunk.text);
        metadatas.push(chunk.metadata);
    }

    Ok(ApiResponse::new(
        format!("{chunks_count} chunk(s) found"),
        json!({
            "ids": ids,
            "documents": documents,
            "metadatas": metadatas,
            "chunks_count": chunks_count,
        }),
    ))
}

/// GET|DELETE /delete-document (alias /delete-chunks)
pub async fn delete_document(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<DocumentParams>,
) -> Result<ApiResponse, ApiError> {
    let selector = params.selector()?;
    let chunks_deleted = state.pipeline.delete_document(&params.collection_name, &selector).await?;
    Ok(ApiResponse::new(
        format!(
            "{chunks_deleted} chunk(s) deleted from collection '{}'",
            params.collection_name
        ),
        json!({ "chunks_deleted": chunks_deleted }),
    ))
}
