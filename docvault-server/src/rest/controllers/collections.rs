use axum::extract::State;
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CollectionParams {
    pub collection_name: String,
}

/// GET /create-collection
pub async fn create_collection(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CollectionParams>,
) -> Result<ApiResponse, ApiError> {
    let info = state.pipeline.create_collection(&params.collection_name).await?;
    Ok(ApiResponse::new(
        format!("collection '{}' created", info.name),
        json!({ "collection": info }),
    ))
}

/// GET /list-all-collections
pub async fn list_collections(State(state): State<AppState>) -> Result<ApiResponse, ApiError> {
    let collections = state.pipeline.list_collections().await?;
    Ok(ApiResponse::new(
        format!("{} collection(s)", collections.len()),
        json!({ "collections": collections }),
    ))
}

/// GET /get-collection
pub async fn get_collection(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CollectionParams>,
) -> Result<ApiResponse, ApiError> {
    let info = state.pipeline.get_collection(&params.collection_name).await?;
    Ok(ApiResponse::new(
        format!("collection '{}' found", info.name),
        json!({ "collection": info }),
    ))
}

/// GET /get-all-metadatas-in-collection
pub async fn list_metadatas(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CollectionParams>,
) -> Result<ApiResponse, ApiError> {
    let metadatas = state.pipeline.list_document_metadatas(&params.collection_name).await?;
    Ok(ApiResponse::new(
        format!(
            "{} document(s) in collection '{}'",
            metadatas.len(),
            params.collection_name
        ),
        json!({ "metadatas": metadatas }),
    ))
}

/// GET /delete-collection
pub async fn delete_collection(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CollectionParams>,
) -> Result<ApiResponse, ApiError> {
    state.pipeline.delete_collection(&params.collection_name).await?;
    Ok(ApiResponse::message(format!("collection '{}' deleted", params.collection_name)))
}
