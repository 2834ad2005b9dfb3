pub mod controllers;

use axum::Router;
use axum::routing::{get, post};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;
use controllers::{collections, documents, query, tokens};

/// Build the service router with every route, CORS and request tracing.
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/create-collection", get(collections::create_collection))
        .route("/list-all-collections", get(collections::list_collections))
        .route("/get-collection", get(collections::get_collection))
        .route("/get-all-metadatas-in-collection", get(collections::list_metadatas))
        .route("/delete-collection", get(collections::delete_collection))
        .route("/add-document", post(documents::add_document))
        .route("/get-chunks", get(documents::get_chunks))
        .route(
            "/delete-document",
            get(documents::delete_document).delete(documents::delete_document),
        )
        .route(
            "/delete-chunks",
            get(documents::delete_document).delete(documents::delete_document),
        )
        .route("/query", get(query::query_get).post(query::query_post))
        .route("/count-tokens", post(tokens::count_tokens))
        .fallback(unknown_route)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn health() -> ApiResponse {
    ApiResponse::new("ok", json!({ "status": "ok" }))
}

async fn unknown_route(uri: axum::http::Uri) -> ApiError {
    ApiError::BadRequest(format!("no route for '{}'", uri.path()))
}
